use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time;

use super::AutosaveScheduler;
use crate::domain::models::DocumentId;
use crate::domain::models::Event;

fn to_generation(event: Option<Event>) -> Result<u64> {
    match event {
        Some(Event::AutosaveElapsed { generation }) => return Ok(generation),
        _ => bail!("Wrong type from recv"),
    }
}

#[tokio::test(start_paused = true)]
async fn it_fires_after_the_window() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let mut scheduler = AutosaveScheduler::new(Duration::from_millis(2000));

    let displaced = scheduler.arm(DocumentId::new("a"), &tx);
    assert!(displaced.is_none());
    assert!(scheduler.is_pending());

    let start = time::Instant::now();
    let generation = to_generation(rx.recv().await)?;
    assert!(start.elapsed() >= Duration::from_millis(2000));

    assert_eq!(scheduler.take_elapsed(generation), Some(DocumentId::new("a")));
    assert!(!scheduler.is_pending());

    return Ok(());
}

#[tokio::test(start_paused = true)]
async fn it_resets_the_window_on_rearm() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let mut scheduler = AutosaveScheduler::new(Duration::from_millis(2000));
    let start = time::Instant::now();

    scheduler.arm(DocumentId::new("a"), &tx);
    time::advance(Duration::from_millis(1500)).await;
    scheduler.arm(DocumentId::new("a"), &tx);
    time::advance(Duration::from_millis(1500)).await;
    let displaced = scheduler.arm(DocumentId::new("a"), &tx);

    assert!(displaced.is_none());
    assert!(rx.try_recv().is_err());

    let generation = to_generation(rx.recv().await)?;
    assert!(start.elapsed() >= Duration::from_millis(5000));
    assert_eq!(scheduler.take_elapsed(generation), Some(DocumentId::new("a")));
    assert!(rx.try_recv().is_err());

    return Ok(());
}

#[tokio::test(start_paused = true)]
async fn it_ignores_stale_generations() -> Result<()> {
    let (tx, _rx) = mpsc::unbounded_channel::<Event>();
    let mut scheduler = AutosaveScheduler::new(Duration::from_millis(10));

    scheduler.arm(DocumentId::new("a"), &tx);
    scheduler.arm(DocumentId::new("a"), &tx);

    assert_eq!(scheduler.take_elapsed(1), None);
    assert!(scheduler.is_pending());
    assert_eq!(scheduler.take_elapsed(2), Some(DocumentId::new("a")));

    return Ok(());
}

#[tokio::test(start_paused = true)]
async fn it_displaces_a_timer_armed_for_another_document() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let mut scheduler = AutosaveScheduler::new(Duration::from_millis(2000));

    scheduler.arm(DocumentId::new("a"), &tx);
    let displaced = scheduler.arm(DocumentId::new("b"), &tx);

    assert_eq!(displaced, Some(DocumentId::new("a")));
    assert_eq!(scheduler.pending_id(), Some(&DocumentId::new("b")));

    let generation = to_generation(rx.recv().await)?;
    assert_eq!(scheduler.take_elapsed(generation), Some(DocumentId::new("b")));

    return Ok(());
}

#[tokio::test(start_paused = true)]
async fn it_cancels_for_a_specific_document() -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let mut scheduler = AutosaveScheduler::new(Duration::from_millis(2000));

    scheduler.arm(DocumentId::new("a"), &tx);
    assert!(!scheduler.cancel_for(&DocumentId::new("b")));
    assert!(scheduler.cancel_for(&DocumentId::new("a")));
    assert!(!scheduler.is_pending());

    time::advance(Duration::from_millis(5000)).await;
    assert!(rx.try_recv().is_err());

    return Ok(());
}
