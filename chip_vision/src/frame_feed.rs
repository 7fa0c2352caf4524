// THEORY:
// The `FrameFeed` decouples frame acquisition from the tick loop. Reading a
// camera or decoding a file blocks, so the source runs on tokio's blocking pool
// and pushes numbered frames into a bounded channel. The tick loop pulls one
// frame per tick and never waits on I/O it did not ask for.
//
// - The bound gives back-pressure: a slow consumer parks the producer instead
//   of letting frames pile up in memory.
// - Frames carry a monotonically increasing `frame_id`, so order is
//   observable. Failed reads are delivered too, in order, as `Err`.
// - The producer stops after delivering `Exhausted`, or as soon as the
//   consumer drops or shuts down the feed.

use crate::error::FrameError;
use crate::frame_source::FrameSource;
use image::RgbImage;
use log::{debug, warn};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct FrameBuffer {
    pub frame_id: u64,
    pub frame: Result<RgbImage, FrameError>,
    pub timestamp: Instant,
}

pub struct FrameFeed {
    receiver: mpsc::Receiver<FrameBuffer>,
    producer: JoinHandle<()>,
}

impl FrameFeed {
    /// Starts reading `source` on the blocking pool. Must be called inside a tokio runtime.
    pub fn spawn<S: FrameSource + 'static>(mut source: S, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let producer = tokio::task::spawn_blocking(move || {
            let mut frame_id = 0u64;
            loop {
                let frame = source.read_frame();
                let exhausted = matches!(frame, Err(FrameError::Exhausted));
                let buffer = FrameBuffer {
                    frame_id,
                    frame,
                    timestamp: Instant::now(),
                };
                if sender.blocking_send(buffer).is_err() {
                    debug!("Frame feed closed after {} frames", frame_id);
                    break;
                }
                if exhausted {
                    debug!("Frame source exhausted after {} frames", frame_id);
                    break;
                }
                frame_id += 1;
            }
        });
        Self { receiver, producer }
    }

    /// Waits for the next frame. `None` once the producer has stopped and the queue is drained.
    pub async fn next(&mut self) -> Option<FrameBuffer> {
        self.receiver.recv().await
    }

    /// The next frame if one is already queued.
    pub fn try_next(&mut self) -> Option<FrameBuffer> {
        self.receiver.try_recv().ok()
    }

    /// Closes the queue and waits for the producer to exit.
    pub async fn shutdown(self) {
        let FrameFeed {
            mut receiver,
            producer,
        } = self;
        receiver.close();
        drop(receiver);
        if let Err(e) = producer.await {
            warn!("Frame producer ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    struct Counting {
        produced: u8,
        limit: u8,
    }

    impl FrameSource for Counting {
        fn read_frame(&mut self) -> Result<RgbImage, FrameError> {
            if self.produced == self.limit {
                return Err(FrameError::Exhausted);
            }
            self.produced += 1;
            if self.produced == 2 {
                return Err(FrameError::Decode("frame 2".into()));
            }
            Ok(RgbImage::from_pixel(1, 1, Rgb([self.produced, 0, 0])))
        }
    }

    #[tokio::test]
    async fn frames_arrive_in_order_until_exhausted() {
        let mut feed = FrameFeed::spawn(Counting { produced: 0, limit: 4 }, 2);
        let mut ids = Vec::new();
        let mut reds = Vec::new();
        let mut errors = Vec::new();
        while let Some(buffer) = feed.next().await {
            ids.push(buffer.frame_id);
            match buffer.frame {
                Ok(frame) => reds.push(frame.get_pixel(0, 0)[0]),
                Err(e) => errors.push(e),
            }
        }
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(reds, vec![1, 3, 4]);
        assert_eq!(
            errors,
            vec![FrameError::Decode("frame 2".into()), FrameError::Exhausted]
        );
    }

    #[tokio::test]
    async fn shutdown_stops_an_endless_producer() {
        struct Endless;
        impl FrameSource for Endless {
            fn read_frame(&mut self) -> Result<RgbImage, FrameError> {
                Ok(RgbImage::new(1, 1))
            }
        }
        let mut feed = FrameFeed::spawn(Endless, 1);
        assert_eq!(feed.next().await.map(|b| b.frame_id), Some(0));
        feed.shutdown().await;
    }
}
