//! Pointer input pipeline: gesture classification → coordinate
//! mapping → command enqueue.
//!
//! The pipeline is an actor that owns the [`GestureClassifier`]
//! exclusively, so no lock is needed around gesture state. Pointer
//! events and long-press timer expiries arrive on the same channel;
//! a press spawns a sleep task that reports back with the captured
//! press id, and stale timers fall out on the id comparison inside
//! the classifier.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dispatch::{Command, CommandSender};
use crate::geometry::{DeviceGeometry, Point};
use crate::gesture::{Gesture, GestureClassifier, LONG_PRESS_DURATION};

// ── PointerEvent ─────────────────────────────────────────────────

/// A pointer event from the windowing collaborator, in UI-viewport
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Press(Point),
    Move(Point),
    Release(Point),
}

enum Event {
    Pointer(PointerEvent),
    LongPressElapsed(u64),
}

// ── PointerSender ────────────────────────────────────────────────

/// Handle the windowing layer uses to feed pointer events in.
#[derive(Debug, Clone)]
pub struct PointerSender {
    tx: mpsc::UnboundedSender<Event>,
}

impl PointerSender {
    /// Forward a pointer event. Events arriving after shutdown are
    /// silently dropped.
    pub fn send(&self, event: PointerEvent) {
        let _ = self.tx.send(Event::Pointer(event));
    }
}

// ── InputPipeline ────────────────────────────────────────────────

/// Spawned pipeline task plus its event-sender handle.
pub struct InputPipeline {
    handle: JoinHandle<()>,
}

impl InputPipeline {
    /// Spawn the pipeline actor.
    ///
    /// Recognised gestures are mapped through `geometry` and
    /// enqueued on `commands`.
    pub fn spawn(
        geometry: DeviceGeometry,
        commands: CommandSender,
        shutdown: CancellationToken,
    ) -> (Self, PointerSender) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let timer_tx = tx.clone();

        let handle = tokio::spawn(async move {
            let mut classifier = GestureClassifier::new();

            loop {
                let event = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    ev = rx.recv() => match ev {
                        Some(ev) => ev,
                        None => break,
                    },
                };

                let gesture = match event {
                    Event::Pointer(PointerEvent::Press(p)) => {
                        let press_id = classifier.press(p);
                        let tx = timer_tx.clone();
                        // Timer task; liveness is decided at expiry
                        // by id comparison, not by cancelling this
                        // sleep.
                        tokio::spawn(async move {
                            tokio::time::sleep(LONG_PRESS_DURATION).await;
                            let _ = tx.send(Event::LongPressElapsed(press_id));
                        });
                        None
                    }
                    Event::Pointer(PointerEvent::Move(p)) => {
                        classifier.motion(p);
                        None
                    }
                    Event::Pointer(PointerEvent::Release(p)) => {
                        classifier.release(p, Instant::now())
                    }
                    Event::LongPressElapsed(id) => classifier.long_press_elapsed(id),
                };

                if let Some(gesture) = gesture {
                    debug!(?gesture, "recognised");
                    if let Err(e) = commands.enqueue(to_command(&geometry, gesture)) {
                        warn!(error = %e, "command queue closed");
                        break;
                    }
                }
            }
        });

        (Self { handle }, PointerSender { tx })
    }

    /// Wait for the actor to exit after cancellation.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

/// Map a UI-coordinate gesture to a device-coordinate command.
fn to_command(geometry: &DeviceGeometry, gesture: Gesture) -> Command {
    match gesture {
        Gesture::Tap(p) => {
            let d = geometry.map(p);
            Command::Tap { x: d.x, y: d.y }
        }
        Gesture::Swipe { from, to } => {
            let f = geometry.map(from);
            let t = geometry.map(to);
            Command::Swipe {
                x0: f.x,
                y0: f.y,
                x1: t.x,
                y1: t.y,
            }
        }
        Gesture::LongPress { at, duration_ms } => {
            let d = geometry.map(at);
            Command::LongPress {
                x: d.x,
                y: d.y,
                duration_ms,
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{CommandDispatcher, DeviceControl, KeyInput};
    use crate::error::MirrorError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct CollectingSink {
        calls: Mutex<Vec<Command>>,
    }

    #[async_trait]
    impl DeviceControl for CollectingSink {
        async fn tap(&self, x: i32, y: i32) -> Result<(), MirrorError> {
            self.calls.lock().unwrap().push(Command::Tap { x, y });
            Ok(())
        }
        async fn swipe(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> Result<(), MirrorError> {
            self.calls
                .lock()
                .unwrap()
                .push(Command::Swipe { x0, y0, x1, y1 });
            Ok(())
        }
        async fn long_press(&self, x: i32, y: i32, duration_ms: u64) -> Result<(), MirrorError> {
            self.calls
                .lock()
                .unwrap()
                .push(Command::LongPress { x, y, duration_ms });
            Ok(())
        }
        async fn key(&self, input: KeyInput) -> Result<(), MirrorError> {
            self.calls.lock().unwrap().push(Command::Key(input));
            Ok(())
        }
    }

    fn setup() -> (
        Arc<CollectingSink>,
        CancellationToken,
        CommandDispatcher,
        InputPipeline,
        PointerSender,
    ) {
        let sink = Arc::new(CollectingSink::default());
        let token = CancellationToken::new();
        let dispatcher = CommandDispatcher::spawn(sink.clone(), token.clone());
        let geometry = DeviceGeometry::for_device(1080, 2400);
        let (pipeline, pointer) =
            InputPipeline::spawn(geometry, dispatcher.sender(), token.clone());
        (sink, token, dispatcher, pipeline, pointer)
    }

    #[tokio::test]
    async fn tap_reaches_sink_in_device_coordinates() {
        let (sink, token, dispatcher, pipeline, pointer) = setup();

        pointer.send(PointerEvent::Press(Point::new(160, 350)));
        pointer.send(PointerEvent::Release(Point::new(160, 350)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        pipeline.join().await;
        dispatcher.join().await;

        let calls = sink.calls.lock().unwrap().clone();
        // 160 * 1080/320 = 540; 350 * 2400/700 = 1200.
        assert_eq!(calls, vec![Command::Tap { x: 540, y: 1200 }]);
    }

    #[tokio::test]
    async fn held_press_produces_long_press_not_tap() {
        let (sink, token, dispatcher, pipeline, pointer) = setup();

        pointer.send(PointerEvent::Press(Point::new(0, 0)));
        // Outlive the 500 ms long-press timer.
        tokio::time::sleep(Duration::from_millis(650)).await;
        pointer.send(PointerEvent::Release(Point::new(0, 0)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        pipeline.join().await;
        dispatcher.join().await;

        let calls = sink.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![Command::LongPress {
                x: 0,
                y: 0,
                duration_ms: 500,
            }]
        );
    }

    #[tokio::test]
    async fn new_press_invalidates_previous_timer() {
        let (sink, token, dispatcher, pipeline, pointer) = setup();

        // First press released quickly; its timer will expire later
        // but must be discarded because a new press superseded it.
        pointer.send(PointerEvent::Press(Point::new(10, 10)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        pointer.send(PointerEvent::Release(Point::new(10, 10)));

        pointer.send(PointerEvent::Press(Point::new(20, 20)));
        pointer.send(PointerEvent::Move(Point::new(120, 20)));
        tokio::time::sleep(Duration::from_millis(600)).await;
        pointer.send(PointerEvent::Release(Point::new(120, 20)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        pipeline.join().await;
        dispatcher.join().await;

        let calls = sink.calls.lock().unwrap().clone();
        // One tap from the first press, one swipe from the second —
        // and no long-press from either stale or cancelled timers.
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], Command::Tap { .. }));
        assert!(matches!(calls[1], Command::Swipe { .. }));
    }
}
