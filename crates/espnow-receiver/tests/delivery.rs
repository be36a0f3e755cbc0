//! End-to-end delivery: transport channel -> receiver -> snapshot

use espnow_receiver::{
    run_delivery, spawn_simulator, spawn_udp_source, FrameReceiver, RawFrame, SimulatedEcu,
    SimulatorConfig, SourceAddress,
};
use snapshot_store::snapshot_store;
use std::time::Duration;
use td5_protocol::{FrameBuilder, FuellingPayload, Message};
use tokio::sync::mpsc;

const SRC: SourceAddress = SourceAddress([0x02, 0, 0, 0, 0, 0x07]);

#[tokio::test]
async fn test_channel_delivery_counts_every_frame() {
    let (publisher, reader) = snapshot_store();
    let receiver = FrameReceiver::new(publisher);
    let (tx, rx) = mpsc::channel(64);

    let mut ecu = SimulatedEcu::new(SimulatorConfig {
        corrupt_every: 3,
        ..Default::default()
    });
    for _ in 0..30 {
        tx.send(ecu.next_frame().unwrap()).await.unwrap();
    }
    tx.send(RawFrame { source: SRC, data: vec![0; 4] }).await.unwrap();
    drop(tx);

    let receiver = run_delivery(receiver, rx).await;

    let snapshot = reader.read();
    assert_eq!(snapshot.packets_received, 20);
    assert_eq!(snapshot.packet_errors, 11);
    assert_eq!(receiver.stats().frames_seen, 31);
    assert_eq!(receiver.stats().last_source, Some(SRC));
    assert!(reader.is_ready());
}

#[tokio::test]
async fn test_corrupted_frames_show_as_sequence_gaps() {
    let (publisher, _reader) = snapshot_store();
    let receiver = FrameReceiver::new(publisher);
    let (tx, rx) = mpsc::channel(64);

    let mut ecu = SimulatedEcu::new(SimulatorConfig {
        corrupt_every: 5,
        ..Default::default()
    });
    for _ in 0..20 {
        tx.send(ecu.next_frame().unwrap()).await.unwrap();
    }
    drop(tx);

    let receiver = run_delivery(receiver, rx).await;
    // frames 5, 10, 15 are dropped mid-stream; frame 20 is the last one sent
    assert_eq!(receiver.stats().loss.lost(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_simulator_task_feeds_snapshot() {
    let (publisher, reader) = snapshot_store();
    let receiver = FrameReceiver::new(publisher);
    let frames = spawn_simulator(
        SimulatorConfig {
            frame_interval_ms: 10,
            ..Default::default()
        },
        16,
    );
    let delivery = tokio::spawn(run_delivery(receiver, frames));

    tokio::time::sleep(Duration::from_millis(200)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let snapshot = reader.read();
    assert!(snapshot.packets_received >= 6, "got {}", snapshot.packets_received);
    assert_eq!(snapshot.packet_errors, 0);
    assert!(snapshot.engine_rpm >= 750);

    delivery.abort();
}

#[tokio::test]
async fn test_udp_source_delivers_datagrams() {
    let (addr, mut frames) = spawn_udp_source("127.0.0.1:0".parse().unwrap(), 8)
        .await
        .unwrap();

    let message = Message::Fuelling(FuellingPayload {
        vehicle_speed: 100,
        engine_rpm: 2500,
        injection_quantity: 1500,
        manifold_air_flow: 300,
        driver_demand: 8000,
    });
    let bytes = FrameBuilder::new().build(1, &message).unwrap();

    let sender = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.send_to(&bytes, addr).await.unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), frames.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(frame.data, bytes);
    assert_eq!(frame.source, SourceAddress::from(sender.local_addr().unwrap()));

    let (publisher, reader) = snapshot_store();
    let mut receiver = FrameReceiver::new(publisher);
    assert_eq!(receiver.on_frame(frame.source, &frame.data).unwrap(), message);
    assert_eq!(reader.read().driver_demand, 8000);
}
