//! Integration tests for polling against a simulated meter.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use emondmon_poll::catalog::{self, REGISTERS};
use emondmon_poll::poller::Pacer;
use emondmon_poll::{
    DeviceClient, GraphId, MeasurementReading, PollerError, Poller, RawRegisterPair, Selection,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Open,
    Read(u16),
    Pause,
    Close,
}

type Log = Rc<RefCell<Vec<Event>>>;

/// Answers every address with `address as f32 / 10.0`, except the missing ones.
struct SimulatedMeter {
    log: Log,
    missing: HashSet<u16>,
    refuse: bool,
    open: bool,
}

impl SimulatedMeter {
    fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            missing: HashSet::new(),
            refuse: false,
            open: false,
        }
    }
}

fn words(value: f32) -> RawRegisterPair {
    let bits = value.to_bits();
    RawRegisterPair::new((bits >> 16) as u16, (bits & 0xFFFF) as u16)
}

impl DeviceClient for SimulatedMeter {
    fn is_open(&self) -> bool {
        self.open
    }

    async fn open(&mut self) -> Result<(), PollerError> {
        self.log.borrow_mut().push(Event::Open);
        if self.refuse {
            return Err(PollerError::Connection("connection refused".to_string()));
        }
        self.open = true;
        Ok(())
    }

    async fn read_pair(&mut self, address: u16) -> Result<Option<RawRegisterPair>, PollerError> {
        self.log.borrow_mut().push(Event::Read(address));
        if self.missing.contains(&address) {
            Ok(None)
        } else {
            Ok(Some(words(address as f32 / 10.0)))
        }
    }

    async fn close(&mut self) {
        self.log.borrow_mut().push(Event::Close);
        self.open = false;
    }
}

struct RecordingPacer(Log);

impl Pacer for RecordingPacer {
    async fn pause(&mut self) {
        self.0.borrow_mut().push(Event::Pause);
    }
}

fn poller(meter: SimulatedMeter, log: &Log) -> Poller<SimulatedMeter, RecordingPacer> {
    Poller::with_pacer(meter, RecordingPacer(log.clone()))
}

#[tokio::test]
async fn test_power_factor_graph_with_missing_leg() {
    let log = Log::default();
    let mut meter = SimulatedMeter::new(&log);
    meter.missing.insert(1046);

    let readings = poller(meter, &log)
        .poll(Selection::from_flags(false, Some(4)).unwrap())
        .await
        .unwrap();

    assert_eq!(
        readings,
        vec![
            MeasurementReading {
                id: "pf",
                value: Some(101.4)
            },
            MeasurementReading {
                id: "pf-a",
                value: None
            },
            MeasurementReading {
                id: "pf-b",
                value: Some(104.8)
            },
            MeasurementReading {
                id: "pf-c",
                value: Some(105.0)
            },
        ]
    );

    assert_eq!(
        *log.borrow(),
        vec![
            Event::Open,
            Event::Read(1014),
            Event::Pause,
            Event::Read(1046),
            Event::Pause,
            Event::Read(1048),
            Event::Pause,
            Event::Read(1050),
            Event::Close,
        ]
    );
}

#[tokio::test]
async fn test_open_failure_returns_connection_error_without_close() {
    for selection in [
        Selection::All,
        Selection::Graph(GraphId::new(1).unwrap()),
        Selection::Graph(GraphId::new(10).unwrap()),
    ] {
        let log = Log::default();
        let mut meter = SimulatedMeter::new(&log);
        meter.refuse = true;

        let result = poller(meter, &log).poll(selection).await;

        assert!(matches!(result, Err(PollerError::Connection(_))));
        assert_eq!(*log.borrow(), vec![Event::Open]);
    }
}

#[tokio::test]
async fn test_poll_all_reads_catalog_in_order_with_pacing() {
    let log = Log::default();
    let meter = SimulatedMeter::new(&log);

    let readings = poller(meter, &log).poll(Selection::All).await.unwrap();

    let ids: Vec<_> = readings.iter().map(|r| r.id).collect();
    let expected: Vec<_> = catalog::all_ids().collect();
    assert_eq!(ids, expected);
    assert!(readings.iter().all(|r| r.value.is_some()));

    let events = log.borrow();
    let reads: Vec<u16> = events
        .iter()
        .filter_map(|e| match e {
            Event::Read(addr) => Some(*addr),
            _ => None,
        })
        .collect();
    let catalog_addrs: Vec<u16> = REGISTERS.iter().map(|r| r.address).collect();
    assert_eq!(reads, catalog_addrs);

    let pauses = events.iter().filter(|e| **e == Event::Pause).count();
    assert_eq!(pauses, REGISTERS.len() - 1);

    // Every pause sits between two reads.
    for (i, event) in events.iter().enumerate() {
        if *event == Event::Pause {
            assert!(matches!(events[i - 1], Event::Read(_)));
            assert!(matches!(events[i + 1], Event::Read(_)));
        }
    }
    assert_eq!(events.first(), Some(&Event::Open));
    assert_eq!(events.last(), Some(&Event::Close));
}

#[tokio::test]
async fn test_every_absent_still_yields_full_result() {
    let log = Log::default();
    let mut meter = SimulatedMeter::new(&log);
    meter.missing = REGISTERS.iter().map(|r| r.address).collect();

    let readings = poller(meter, &log)
        .poll(Selection::Graph(GraphId::new(5).unwrap()))
        .await
        .unwrap();

    assert_eq!(readings.len(), 4);
    assert!(readings.iter().all(MeasurementReading::is_absent));
    assert_eq!(log.borrow().last(), Some(&Event::Close));
}

/// Build the selection from command-line style flags, then poll with it.
async fn poll_flags(
    all: bool,
    graph: Option<i64>,
    log: &Log,
) -> Result<Vec<MeasurementReading>, PollerError> {
    let selection = Selection::from_flags(all, graph)?;
    poller(SimulatedMeter::new(log), log).poll(selection).await
}

#[tokio::test]
async fn test_invalid_selection_never_opens_device() {
    for (all, graph) in [
        (false, Some(0)),
        (false, Some(11)),
        (false, Some(-1)),
        (false, Some(256)),
        (true, Some(2)),
        (false, None),
    ] {
        let log = Log::default();
        let result = poll_flags(all, graph, &log).await;

        assert!(
            matches!(result, Err(PollerError::InvalidSelection(_))),
            "all={} graph={:?}",
            all,
            graph
        );
        assert!(!log.borrow().contains(&Event::Open));
    }

    // A valid selection goes through the same path and does reach the meter.
    let log = Log::default();
    let readings = poll_flags(false, Some(6), &log).await.unwrap();
    assert_eq!(readings.len(), 1);
    assert_eq!(log.borrow().first(), Some(&Event::Open));
}

#[tokio::test]
async fn test_poller_reusable_for_sequential_polls() {
    let log = Log::default();
    let mut poller = poller(SimulatedMeter::new(&log), &log);

    let first = poller
        .poll(Selection::Graph(GraphId::new(6).unwrap()))
        .await
        .unwrap();
    let second = poller
        .poll(Selection::Graph(GraphId::new(3).unwrap()))
        .await
        .unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 2);
    let opens = log.borrow().iter().filter(|e| **e == Event::Open).count();
    let closes = log.borrow().iter().filter(|e| **e == Event::Close).count();
    assert_eq!((opens, closes), (2, 2));
}
