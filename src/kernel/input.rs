use std::io::BufRead;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

pub struct InputChannel {
    receiver: UnboundedReceiver<String>,
}

#[derive(Clone)]
pub struct InputFeed {
    sender: Arc<Mutex<Option<UnboundedSender<String>>>>,
}

impl InputChannel {
    pub fn pair() -> (Self, InputFeed) {
        let (sender, receiver) = unbounded_channel();
        (
            Self { receiver },
            InputFeed {
                sender: Arc::new(Mutex::new(Some(sender))),
            },
        )
    }

    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    pub fn recv_blocking(&mut self) -> Option<String> {
        self.receiver.blocking_recv()
    }
}

impl InputFeed {
    pub fn push(&self, line: String) -> bool {
        let Ok(guard) = self.sender.lock() else {
            return false;
        };
        guard
            .as_ref()
            .is_some_and(|sender| sender.send(line).is_ok())
    }

    pub fn close(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .map(|guard| guard.as_ref().is_none_or(UnboundedSender::is_closed))
            .unwrap_or(true)
    }

    pub fn spawn_reader<R>(&self, reader: R) -> std::io::Result<JoinHandle<()>>
    where
        R: BufRead + Send + 'static,
    {
        let feed = self.clone();
        thread::Builder::new()
            .name("input-reader".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let Ok(line) = line else {
                        break;
                    };
                    if !feed.push(line) {
                        return;
                    }
                }
                feed.close();
            })
    }
}
