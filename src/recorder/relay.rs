use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::capture::{Bgr, Frame, FrameSource, Rect};
use crate::utils::sync::lock;

/// Pause when the source has nothing newer than the last relayed frame.
const IDLE_DELAY: Duration = Duration::from_millis(1);

/// Detection overlay requested by the owner of the recorder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Annotation {
    pub rect: Option<Rect>,
    pub positive: bool,
}

impl Annotation {
    /// Red for a positive detection, blue otherwise.
    pub fn color(&self) -> Bgr {
        if self.positive {
            Bgr::RED
        } else {
            Bgr::BLUE
        }
    }
}

/// Body of the relay thread: copy every new source frame into `working`
/// until `running` clears. With an `annotation`, the rectangle is drawn onto
/// the next frame each time it changes.
///
/// Returns the number of frames relayed.
pub(crate) fn run(
    source: &FrameSource,
    working: &Mutex<Frame>,
    annotation: Option<&Mutex<Annotation>>,
    running: &AtomicBool,
) -> u64 {
    let mut last_sequence = lock(working).sequence();
    let mut drawn = Annotation::default();
    let mut relayed = 0u64;

    while running.load(Ordering::SeqCst) {
        let Some(mut frame) = source.latest_frame_after(last_sequence) else {
            thread::sleep(IDLE_DELAY);
            continue;
        };
        last_sequence = frame.sequence();

        if let Some(annotation) = annotation {
            let current = *lock(annotation);
            if current != drawn {
                if let Some(rect) = current.rect {
                    frame.draw_rectangle(rect, current.color());
                }
                drawn = current;
            }
        }

        std::mem::swap(&mut *lock(working), &mut frame);
        relayed += 1;
    }
    relayed
}
