use crate::*;
use crate::status::*;

use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;

// ============================================================================
//  HELPERS
// ============================================================================

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq)]
struct Point {
    x: i32,
    y: i32,
    label: String,
}

impl Parcelable for Point {
    fn marshal(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_i32(self.x)?;
        parcel.write_i32(self.y)?;
        parcel.write_string16(&self.label)
    }

    fn unmarshal(parcel: &mut Parcel) -> Result<Self> {
        Ok(Self {
            x: parcel.read_i32()?,
            y: parcel.read_i32()?,
            label: parcel.read_string16()?,
        })
    }
}

/// Writes three fields but reads only two, leaving part of its body unread.
struct Greedy;

impl Parcelable for Greedy {
    fn marshal(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_i32(1)?;
        parcel.write_i32(2)?;
        parcel.write_i32(3)
    }

    fn unmarshal(parcel: &mut Parcel) -> Result<Self> {
        parcel.read_i32()?;
        parcel.read_i32()?;
        Ok(Self)
    }
}

/// A chain of records, each holding the next.
struct Nest {
    inner: Option<Box<Nest>>,
}

impl Nest {
    fn chain(depth: usize) -> Self {
        let mut nest = Nest { inner: None };
        for _ in 1..depth {
            nest = Nest { inner: Some(Box::new(nest)) };
        }
        nest
    }

    fn depth(&self) -> usize {
        let mut depth = 1;
        let mut cur = self;
        while let Some(inner) = &cur.inner {
            depth += 1;
            cur = inner;
        }
        depth
    }
}

impl Parcelable for Nest {
    fn marshal(&self, parcel: &mut Parcel) -> Result<()> {
        parcel.write_parcelable(self.inner.as_deref())
    }

    fn unmarshal(parcel: &mut Parcel) -> Result<Self> {
        Ok(Self { inner: parcel.read_optional_parcelable()?.map(Box::new) })
    }
}

/// Answers code 1 by echoing an i32 plus one.
struct EchoStub;

#[async_trait]
impl RemoteStub for EchoStub {
    fn descriptor(&self) -> &str {
        "test.Echo"
    }

    async fn on_remote_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        _option: MessageOption,
    ) -> i32 {
        match data.read_interface_token() {
            Ok(token) if token == self.descriptor() => {}
            _ => return ERR_INVALID_DATA,
        }
        match code {
            1 => match data.read_i32().and_then(|v| reply.write_i32(v + 1)) {
                Ok(()) => ERR_NONE,
                Err(_) => ERR_INVALID_DATA,
            },
            _ => default_on_remote_request(self.descriptor(), code, reply),
        }
    }
}

/// Panics on code 2, echoes everything else.
struct FaultyStub;

#[async_trait]
impl RemoteStub for FaultyStub {
    fn descriptor(&self) -> &str {
        "test.Echo"
    }

    async fn on_remote_request(
        &self,
        code: u32,
        data: &mut Parcel,
        reply: &mut Parcel,
        option: MessageOption,
    ) -> i32 {
        if code == 2 {
            panic!("handler fault");
        }
        EchoStub.on_remote_request(code, data, reply, option).await
    }
}

#[derive(Default)]
struct CountingRecipient {
    deaths: AtomicUsize,
}

impl DeathRecipient for CountingRecipient {
    fn on_remote_died(&self) {
        self.deaths.fetch_add(1, Ordering::SeqCst);
    }
}

fn echo_request(v: i32) -> Parcel {
    let mut data = Parcel::new();
    data.write_interface_token("test.Echo").unwrap();
    data.write_i32(v).unwrap();
    data
}

async fn wait_for(counter: &CountingRecipient, expected: usize) {
    for _ in 0..200 {
        if counter.deaths.load(Ordering::SeqCst) >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// ============================================================================
//  SCALARS AND STRINGS
// ============================================================================

#[test]
fn test_scalars_read_back_in_order() -> Result<()> {
    let mut p = Parcel::new();
    p.write_bool(true)?;
    p.write_i8(-8)?;
    p.write_i16(i16::MIN)?;
    p.write_i32(-42)?;
    p.write_i64(i64::MAX)?;
    p.write_u32(u32::MAX)?;
    p.write_u64(7)?;
    p.write_f32(1.5)?;
    p.write_f64(-0.25)?;

    assert_eq!(p.read_bool()?, true);
    assert_eq!(p.read_i8()?, -8);
    assert_eq!(p.read_i16()?, i16::MIN);
    assert_eq!(p.read_i32()?, -42);
    assert_eq!(p.read_i64()?, i64::MAX);
    assert_eq!(p.read_u32()?, u32::MAX);
    assert_eq!(p.read_u64()?, 7);
    assert_eq!(p.read_f32()?, 1.5);
    assert_eq!(p.read_f64()?, -0.25);
    assert_eq!(p.remaining(), 0);
    Ok(())
}

#[test]
fn test_strings_keep_their_encoding() -> Result<()> {
    let mut p = Parcel::new();
    p.write_string("plain")?;
    p.write_string16("wide \u{1F600}")?;
    p.write_string16("")?;

    assert_eq!(p.read_string()?, "plain");
    assert_eq!(p.read_string16()?, "wide \u{1F600}");
    assert_eq!(p.read_string16()?, "");
    Ok(())
}

#[test]
fn test_wrong_kind_fails_without_moving_cursor() -> Result<()> {
    let mut p = Parcel::new();
    p.write_string16("hello")?;

    let err = p.read_string().unwrap_err();
    assert_eq!(err, Error::TagMismatch { expected: Tag::String8, found: Tag::String16 });
    assert_eq!(p.read_position(), 0);
    assert!(p.read_i32().is_err());
    assert_eq!(p.read_string16()?, "hello");
    Ok(())
}

#[test]
fn test_read_past_end() {
    let mut p = Parcel::new();
    assert_eq!(p.read_i32().unwrap_err(), Error::UnexpectedEnd);
    assert!(p.read_parcelable::<Point>().is_none());
    assert!(p.read_remote_object().is_none());
}

#[test]
fn test_interface_token() -> Result<()> {
    let mut p = Parcel::new();
    p.write_interface_token("ohos.test.Token")?;
    p.write_string16("ohos.test.Token")?;

    assert_eq!(p.read_interface_token()?, "ohos.test.Token");
    // A plain string is not a token.
    assert!(p.read_interface_token().is_err());
    Ok(())
}

// ============================================================================
//  CAPACITY
// ============================================================================

#[test]
fn test_capacity_exceeded_leaves_parcel_unchanged() -> Result<()> {
    let mut p = Parcel::with_config(ParcelConfig::default().with_max_capacity(16));
    p.write_i32(1)?;
    let before = p.data_size();

    let err = p.write_string("this string does not fit").unwrap_err();
    assert!(matches!(err, Error::CapacityExceeded { capacity: 16, .. }));
    assert_eq!(p.data_size(), before);

    // A vector that overflows halfway is undone as a whole.
    assert!(p.write_i32_vector(&[1, 2, 3]).is_err());
    assert_eq!(p.data_size(), before);
    Ok(())
}

#[test]
fn test_failed_record_write_is_undone() -> Result<()> {
    let mut p = Parcel::with_config(ParcelConfig::default().with_max_capacity(20));
    let point = Point { x: 1, y: 2, label: "a long label that overflows".into() };
    assert!(p.write_parcelable(Some(&point)).is_err());
    assert_eq!(p.data_size(), 0);
    Ok(())
}

// ============================================================================
//  RECORDS
// ============================================================================

#[test]
fn test_parcelable_and_null() -> Result<()> {
    let point = Point { x: 3, y: -4, label: "origin".into() };
    let mut p = Parcel::new();
    p.write_parcelable(Some(&point))?;
    p.write_parcelable::<Point>(None)?;
    p.write_i32(99)?;

    assert_eq!(p.read_parcelable::<Point>(), Some(point));
    assert_eq!(p.read_parcelable::<Point>(), None);
    assert_eq!(p.read_i32()?, 99);
    Ok(())
}

#[test]
fn test_partially_consumed_record_is_rejected_and_skipped() -> Result<()> {
    let mut p = Parcel::new();
    p.write_parcelable(Some(&Greedy))?;
    p.write_i32(7)?;

    assert!(p.read_parcelable::<Greedy>().is_none());
    assert_eq!(p.read_i32()?, 7);
    Ok(())
}

#[test]
fn test_record_cannot_read_past_its_body() -> Result<()> {
    // Marshal two ints, then try to read them as a Point which also wants a string.
    struct Pair;
    impl Parcelable for Pair {
        fn marshal(&self, parcel: &mut Parcel) -> Result<()> {
            parcel.write_i32(1)?;
            parcel.write_i32(2)
        }
        fn unmarshal(_: &mut Parcel) -> Result<Self> {
            Ok(Self)
        }
    }

    let mut p = Parcel::new();
    p.write_parcelable(Some(&Pair))?;
    p.write_string16("outside")?;

    assert!(p.read_parcelable::<Point>().is_none());
    assert_eq!(p.read_string16()?, "outside");
    Ok(())
}

#[test]
fn test_nesting_is_bounded_by_max_depth() -> Result<()> {
    init_tracing();
    let mut p = Parcel::new();
    p.write_parcelable(Some(&Nest::chain(ParcelConfig::DEFAULT_MAX_DEPTH)))?;
    p.write_parcelable(Some(&Nest::chain(ParcelConfig::DEFAULT_MAX_DEPTH + 1)))?;
    p.write_parcelable(Some(&Nest::chain(1000)))?;
    p.write_i32(5)?;

    let nest = p.read_parcelable::<Nest>().map(|n| n.depth());
    assert_eq!(nest, Some(ParcelConfig::DEFAULT_MAX_DEPTH));
    assert!(p.read_parcelable::<Nest>().is_none());
    assert!(p.read_parcelable::<Nest>().is_none());
    assert_eq!(p.read_i32()?, 5);
    Ok(())
}

#[test]
fn test_max_depth_is_configurable() -> Result<()> {
    let mut p = Parcel::with_config(ParcelConfig::default().with_max_depth(3));
    p.write_parcelable(Some(&Nest::chain(3)))?;
    p.write_parcelable(Some(&Nest::chain(4)))?;

    assert_eq!(p.read_parcelable::<Nest>().map(|n| n.depth()), Some(3));
    assert!(p.read_parcelable::<Nest>().is_none());
    assert_eq!(p.remaining(), 0);
    Ok(())
}

#[test]
fn test_parcelable_vector_rejects_null_element() -> Result<()> {
    let points = vec![
        Point { x: 1, y: 1, label: "a".into() },
        Point { x: 2, y: 2, label: "b".into() },
    ];
    let mut p = Parcel::new();
    p.write_parcelable_vector(&points)?;
    assert_eq!(p.read_parcelable_vector::<Point>()?, points);

    let mut p = Parcel::new();
    p.write_i32(1)?;
    p.write_parcelable::<Point>(None)?;
    assert_eq!(p.read_parcelable_vector::<Point>().unwrap_err(), Error::MissingRecord);
    Ok(())
}

// ============================================================================
//  SEQUENCES
// ============================================================================

#[test]
fn test_vectors() -> Result<()> {
    let mut p = Parcel::new();
    p.write_bool_vector(&[true, false])?;
    p.write_i8_vector(&[-1, 0, 1])?;
    p.write_i64_vector(&[])?;
    p.write_f64_vector(&[0.5, 2.0])?;
    p.write_string16_vector(&["x".to_string(), "yz".to_string()])?;

    assert_eq!(p.read_bool_vector()?, vec![true, false]);
    assert_eq!(p.read_i8_vector()?, vec![-1, 0, 1]);
    assert_eq!(p.read_i64_vector()?, Vec::<i64>::new());
    assert_eq!(p.read_f64_vector()?, vec![0.5, 2.0]);
    assert_eq!(p.read_string16_vector()?, vec!["x".to_string(), "yz".to_string()]);
    Ok(())
}

#[test]
fn test_negative_count_rejected() -> Result<()> {
    let mut p = Parcel::new();
    p.write_i32(-1)?;
    assert_eq!(p.read_string_vector().unwrap_err(), Error::NegativeLength(-1));
    assert_eq!(p.read_position(), 0);
    Ok(())
}

#[test]
fn test_count_larger_than_data_rejected() -> Result<()> {
    let mut p = Parcel::new();
    p.write_i32(1_000_000)?;
    p.write_i32(1)?;
    assert_eq!(p.read_i32_vector().unwrap_err(), Error::UnexpectedEnd);
    Ok(())
}

// ============================================================================
//  OBJECTS AND DESCRIPTORS
// ============================================================================

#[test]
fn test_remote_object_shares_the_reference() -> Result<()> {
    let object = LocalObject::handle(Arc::new(EchoStub));
    let mut p = Parcel::new();
    p.write_remote_object(Some(&object))?;
    p.write_remote_object(None)?;
    assert_eq!(Arc::strong_count(&object), 2);

    let read = p.read_remote_object().expect("object");
    assert!(Arc::ptr_eq(&read, &object));
    assert!(p.read_remote_object().is_none());

    drop(read);
    drop(p);
    assert_eq!(Arc::strong_count(&object), 1);
    Ok(())
}

#[test]
fn test_object_table_limit() -> Result<()> {
    let object = LocalObject::handle(Arc::new(EchoStub));
    let mut p = Parcel::with_config(ParcelConfig::default().with_max_objects(1));
    p.write_remote_object(Some(&object))?;
    assert_eq!(p.write_remote_object(Some(&object)).unwrap_err(), Error::TooManyObjects(1));
    assert_eq!(p.object_count(), 1);
    Ok(())
}

#[test]
fn test_file_descriptor_is_duplicated_and_taken_once() -> anyhow::Result<()> {
    let file = std::fs::File::open("/dev/null")?;
    let mut p = Parcel::new();
    p.write_file_descriptor(&file)?;

    let fd = p.read_file_descriptor().expect("descriptor");
    assert_ne!(fd.as_raw_fd(), file.as_raw_fd());

    p.rewind();
    assert!(p.read_file_descriptor().is_none());
    Ok(())
}

// ============================================================================
//  DEATH NOTIFICATION
// ============================================================================

#[test]
fn test_notifier_delivers_once() {
    let notifier = DeathNotifier::new();
    let counter = Arc::new(CountingRecipient::default());
    assert!(notifier.add(counter.clone()));

    assert_eq!(notifier.notify(), 1);
    assert_eq!(notifier.notify(), 0);
    assert_eq!(counter.deaths.load(Ordering::SeqCst), 1);

    // Inert after death.
    assert!(!notifier.add(counter.clone()));
    assert!(notifier.is_empty());
}

#[test]
fn test_removed_recipient_is_not_notified() {
    let notifier = DeathNotifier::new();
    let counter = Arc::new(CountingRecipient::default());
    let recipient: Arc<dyn DeathRecipient> = counter.clone();
    assert!(notifier.add(recipient.clone()));
    assert!(notifier.remove(&recipient));
    assert!(!notifier.remove(&recipient));

    notifier.notify();
    assert_eq!(counter.deaths.load(Ordering::SeqCst), 0);
}

#[test]
fn test_local_object_refuses_death_registration() {
    let object = LocalObject::handle(Arc::new(EchoStub));
    assert!(!object.add_death_recipient(Arc::new(CountingRecipient::default())));
    assert!(!object.is_proxy());
    assert!(!object.is_dead());
}

// ============================================================================
//  TRANSPORT
// ============================================================================

#[tokio::test]
async fn test_local_object_dispatch() {
    let object = LocalObject::handle(Arc::new(EchoStub));
    let mut data = echo_request(41);
    let mut reply = Parcel::new();
    let status = object.send_request(1, &mut data, &mut reply, MessageOption::sync()).await;
    assert_eq!(status, ERR_NONE);
    assert_eq!(reply.read_i32().unwrap(), 42);
}

#[tokio::test]
async fn test_channel_round_trip() {
    let (remote, _server) = channel(Arc::new(EchoStub), ChannelConfig::default());
    assert!(remote.is_proxy());

    let mut data = echo_request(9);
    let mut reply = Parcel::new();
    let status = remote.send_request(1, &mut data, &mut reply, MessageOption::sync()).await;
    assert_eq!(status, ERR_NONE);
    assert_eq!(reply.read_i32().unwrap(), 10);
}

#[tokio::test]
async fn test_failed_handler_is_not_remote_death() {
    init_tracing();
    let (remote, _server) = channel(Arc::new(FaultyStub), ChannelConfig::default());

    let mut reply = Parcel::new();
    let status = remote.send_request(2, &mut echo_request(1), &mut reply, MessageOption::sync()).await;
    assert_eq!(status, ERR_TRANSACTION_FAILED);
    assert!(!remote.is_dead());

    let mut reply = Parcel::new();
    let status = remote.send_request(1, &mut echo_request(1), &mut reply, MessageOption::sync()).await;
    assert_eq!(status, ERR_NONE);
    assert_eq!(reply.read_i32().unwrap(), 2);
}

#[tokio::test]
async fn test_ping_and_interface_fallback() {
    let (remote, _server) = channel(Arc::new(EchoStub), ChannelConfig::default());
    assert_eq!(ping(&remote, "test.Echo").await, ERR_NONE);
    assert_eq!(interface_descriptor(&remote, "test.Echo").await, Ok("test.Echo".to_string()));

    let mut data = echo_request(0);
    let mut reply = Parcel::new();
    let status = remote.send_request(77, &mut data, &mut reply, MessageOption::sync()).await;
    assert_eq!(status, ERR_UNKNOWN_TRANSACTION);
}

#[tokio::test]
async fn test_one_way_returns_empty_reply() {
    let (remote, _server) = channel(Arc::new(EchoStub), ChannelConfig::default());
    let mut data = echo_request(1);
    let mut reply = Parcel::new();
    let status = remote.send_request(1, &mut data, &mut reply, MessageOption::one_way()).await;
    assert_eq!(status, ERR_NONE);
    assert_eq!(reply.data_size(), 0);
}

#[tokio::test]
async fn test_server_shutdown_notifies_once() {
    init_tracing();
    let (remote, server) = channel(Arc::new(EchoStub), ChannelConfig::default());
    let counter = Arc::new(CountingRecipient::default());
    assert!(remote.add_death_recipient(counter.clone()));

    server.shutdown();
    wait_for(&counter, 1).await;
    assert_eq!(counter.deaths.load(Ordering::SeqCst), 1);
    assert!(remote.is_dead());

    // Sending to a dead object fails and does not notify again.
    let mut data = echo_request(1);
    let mut reply = Parcel::new();
    let status = remote.send_request(1, &mut data, &mut reply, MessageOption::sync()).await;
    assert_eq!(status, ERR_DEAD_OBJECT);
    assert_eq!(counter.deaths.load(Ordering::SeqCst), 1);

    assert!(!remote.add_death_recipient(Arc::new(CountingRecipient::default())));
}
