//! # abilityrpc
//!
//! The calls an ability manager and the abilities it supervises make to each
//! other, carried over [`ipc`] parcels.
//!
//! ## Contracts
//!
//! - [`AbilityManager`]: start, stop and connect abilities; manage missions.
//! - [`AbilityScheduler`]: drive one ability's lifecycle; reach a data ability's rows.
//! - [`AbilityConnection`]: hear back about a service connection.
//!
//! Each contract has a proxy, which turns calls into requests on a
//! [`RemoteHandle`](ipc::RemoteHandle), and a stub, which serves an
//! implementation of the trait behind one.
//!
//! ## Requests
//!
//! Every request starts with the contract's interface token. A stub that finds
//! a different token answers [`ERR_INVALID_STATE`] without reading further.
//! Unknown codes fall through to [`ipc::default_on_remote_request`].

pub mod codes;
pub mod connection;
pub mod data;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod mission;
pub mod scheduler;
pub mod want;

mod rpc;

pub use codes::ABILITY_CONNECTION_TOKEN;
pub use codes::ABILITY_MANAGER_TOKEN;
pub use codes::ABILITY_SCHEDULER_TOKEN;
pub use codes::AbilityConnectionCode;
pub use codes::AbilityManagerCode;
pub use codes::AbilitySchedulerCode;
pub use connection::AbilityConnection;
pub use connection::AbilityConnectionProxy;
pub use connection::AbilityConnectionStub;
pub use data::DataAbilityPredicates;
pub use data::FileMode;
pub use data::ResultSet;
pub use data::Uri;
pub use data::ValueObject;
pub use data::ValuesBucket;
pub use error::ERR_INVALID_STATE;
pub use error::ERR_INVALID_VALUE;
pub use error::ERR_OK;
pub use error::Error;
pub use error::INNER_ERR;
pub use error::Result;
pub use lifecycle::AbilityLifeCycleState;
pub use lifecycle::LifeCycleStateInfo;
pub use manager::AbilityManager;
pub use manager::AbilityManagerProxy;
pub use manager::AbilityManagerStub;
pub use mission::AbilityRecordInfo;
pub use mission::MissionDescriptionInfo;
pub use mission::MissionRecordInfo;
pub use mission::MissionSnapshotInfo;
pub use mission::MissionStackInfo;
pub use mission::RecentMissionInfo;
pub use mission::StackInfo;
pub use scheduler::AbilityScheduler;
pub use scheduler::AbilitySchedulerProxy;
pub use scheduler::AbilitySchedulerStub;
pub use want::ElementName;
pub use want::PacMap;
pub use want::ParamValue;
pub use want::Want;
pub use want::WantParams;
