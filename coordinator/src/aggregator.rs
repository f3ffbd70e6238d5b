use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, error};
use shared::models::pixel::Pixel;
use tokio::{sync::mpsc::Receiver, task::JoinHandle};

/// Upper bound on pixels appended under one write lock.
const MAX_BATCH: usize = 4096;

/// Read-only handle on the aggregated pixels.
///
/// The buffer only ever grows, so `snapshot_from(previous_len)` hands a
/// display exactly the pixels it has not drawn yet.
#[derive(Debug, Clone, Default)]
pub struct PixelView {
    buffer: Arc<RwLock<Vec<Pixel>>>,
}

impl PixelView {
    pub fn len(&self) -> usize {
        self.buffer.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<Pixel> {
        self.snapshot_from(0)
    }

    pub fn snapshot_from(&self, offset: usize) -> Vec<Pixel> {
        let buffer = self.buffer.read().unwrap_or_else(PoisonError::into_inner);
        buffer.get(offset..).map(<[Pixel]>::to_vec).unwrap_or_default()
    }

    fn append(&self, pixels: Vec<Pixel>) {
        self.buffer
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(pixels);
    }
}

/// The single writer of the pixel buffer. Pixels are kept in arrival
/// order; nothing is removed or deduplicated.
#[derive(Debug)]
pub struct PixelAggregator {
    view: PixelView,
    writer: JoinHandle<()>,
}

impl PixelAggregator {
    /// Starts draining `rx`. The writer ends once every sender is dropped.
    pub fn spawn(mut rx: Receiver<Pixel>) -> Self {
        let view = PixelView::default();
        let writer_view = view.clone();

        let writer = tokio::spawn(async move {
            while let Some(pixel) = rx.recv().await {
                let mut batch = Vec::with_capacity(64);
                batch.push(pixel);
                while batch.len() < MAX_BATCH {
                    match rx.try_recv() {
                        Ok(pixel) => batch.push(pixel),
                        Err(_) => break,
                    }
                }
                writer_view.append(batch);
            }
            debug!("Pixel channel closed with {} pixels", writer_view.len());
        });

        Self { view, writer }
    }

    pub fn view(&self) -> PixelView {
        self.view.clone()
    }

    /// Waits for the channel to close and returns every received pixel.
    pub async fn finish(self) -> Vec<Pixel> {
        if let Err(e) = self.writer.await {
            error!("Pixel aggregator stopped early: {}", e);
        }
        self.view.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use shared::models::pixel::Color;
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn keeps_arrival_order_and_duplicates() {
        let (tx, rx) = mpsc::channel(4);
        let aggregator = PixelAggregator::spawn(rx);
        let view = aggregator.view();

        let pixels = [
            Pixel::new(1, 1, Color::new(1.0, 0.0, 0.0)),
            Pixel::new(0, 0, Color::new(0.0, 1.0, 0.0)),
            Pixel::new(1, 1, Color::new(0.0, 0.0, 1.0)),
        ];
        for pixel in pixels {
            tx.send(pixel).await.unwrap();
        }
        drop(tx);

        let received = aggregator.finish().await;
        assert_eq!(received, pixels.to_vec());
        assert_eq!(view.len(), 3);
        assert_eq!(view.snapshot_from(2), vec![pixels[2]]);
        assert!(view.snapshot_from(10).is_empty());
    }

    #[tokio::test]
    async fn many_senders_fan_in() {
        let (tx, rx) = mpsc::channel(16);
        let aggregator = PixelAggregator::spawn(rx);

        let senders: Vec<_> = (0..4u32)
            .map(|w| {
                let tx = tx.clone();
                tokio::spawn(async move {
                    for i in 0..250u32 {
                        tx.send(Pixel::new(i, w, Color::default())).await.unwrap();
                    }
                })
            })
            .collect();
        drop(tx);
        for sender in senders {
            sender.await.unwrap();
        }

        assert_eq!(aggregator.finish().await.len(), 1000);
    }
}
