//! LogMinerCdc start/stop and fatal error surfacing
//!
//! Run with: cargo test -p rivven-logminer --test source_lifecycle

mod harness;

use harness::*;
use pretty_assertions::assert_eq;
use rivven_logminer::common::{CdcError, CdcSource, OffsetStore};
use rivven_logminer::logminer::{
    LogMinerCdc, LogMinerConfig, MemoryLogCatalog, MemoryMiningEngine,
};
use std::time::Duration;
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn source(
    fixture: &OracleFixture,
    config: LogMinerConfig,
) -> LogMinerCdc<MemoryLogCatalog, MemoryMiningEngine> {
    LogMinerCdc::new(
        config,
        fixture.catalog.clone(),
        fixture.engine.clone(),
        fixture.offsets.clone(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_streams_rows_and_stops_cleanly() {
    init_test_logging();
    let fixture = OracleFixture::standard();
    fixture.engine.push_rows(dml_rows(&[110, 220, 330]));
    let mut cdc = source(&fixture, fixture.config());
    let mut rows = cdc.take_event_receiver().unwrap();

    cdc.start().await.unwrap();
    assert!(cdc.is_healthy().await);

    let mut scns = Vec::new();
    for _ in 0..3 {
        let row = timeout(RECV_TIMEOUT, rows.recv()).await.unwrap().unwrap();
        scns.push(row.scn);
    }
    assert_eq!(scns, vec![scn(110), scn(220), scn(330)]);

    cdc.stop().await.unwrap();
    timeout(RECV_TIMEOUT, cdc.wait()).await.unwrap().unwrap();
    assert!(!cdc.is_healthy().await);

    let stored = fixture.offsets.load("ORCL").await.unwrap().unwrap();
    assert!(stored.scn >= scn(331));
    assert!(cdc.metrics().cycles >= 1);
    assert_eq!(cdc.metrics().rows_mined, 3);
}

#[tokio::test]
async fn test_capture_gap_surfaces_from_wait() {
    let fixture = OracleFixture::standard();
    let config = LogMinerConfig {
        start_scn: "10".to_string(),
        ..fixture.config()
    };
    let mut cdc = source(&fixture, config);
    let _rows = cdc.take_event_receiver().unwrap();

    cdc.start().await.unwrap();
    let err = timeout(RECV_TIMEOUT, cdc.wait()).await.unwrap().unwrap_err();

    assert!(matches!(err, CdcError::WindowGap { from, to } if from == scn(10) && to == scn(100)));
    assert!(!cdc.is_healthy().await);
    assert_eq!(cdc.metrics().gaps, 1);
    assert_eq!(fixture.offsets.save_count(), 0);
}

#[tokio::test]
async fn test_cannot_start_twice() {
    let fixture = OracleFixture::standard();
    let mut cdc = source(&fixture, fixture.config());
    let _rows = cdc.take_event_receiver().unwrap();

    cdc.start().await.unwrap();
    assert!(cdc.start().await.is_err());

    cdc.stop().await.unwrap();
    timeout(RECV_TIMEOUT, cdc.wait()).await.unwrap().unwrap();
    assert!(cdc.start().await.is_err());
}

#[tokio::test]
async fn test_dropped_receiver_ends_loop() {
    let fixture = OracleFixture::standard();
    fixture.engine.push_rows(dml_rows(&[150]));
    let mut cdc = source(&fixture, fixture.config());
    drop(cdc.take_event_receiver());

    cdc.start().await.unwrap();
    timeout(RECV_TIMEOUT, cdc.wait()).await.unwrap().unwrap();
    assert_eq!(fixture.offsets.save_count(), 0);
}
