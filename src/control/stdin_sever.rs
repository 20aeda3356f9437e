//! `StdinSeverMonitor` (§4.6): exits the process as soon as standard input closes. Used by
//! spawned control children (so they die with their parent) and optionally by the main process
//! (`--terminate-with-stdin`).

use std::io::Read;
use std::thread;

use log::info;

pub struct StdinSeverMonitor {
    handle: Option<thread::JoinHandle<()>>,
}

impl StdinSeverMonitor {
    /// Spawns the background reader. There is nothing to join in the ordinary case: the monitor
    /// calls `std::process::exit` itself the moment stdin closes, so this handle only exists to
    /// satisfy ownership and is never expected to join during a clean shutdown.
    pub fn start(exit_code: i32) -> StdinSeverMonitor {
        let handle = thread::Builder::new()
            .name("hiccup-stdin-sever".into())
            .spawn(move || {
                let mut byte = [0u8; 1];
                loop {
                    match std::io::stdin().read(&mut byte) {
                        Ok(0) => {
                            info!("stdin closed, terminating");
                            std::process::exit(exit_code);
                        }
                        Ok(_) => continue,
                        Err(_) => {
                            info!("stdin read error, terminating");
                            std::process::exit(exit_code);
                        }
                    }
                }
            })
            .expect("failed to spawn hiccup-stdin-sever thread");

        StdinSeverMonitor {
            handle: Some(handle),
        }
    }
}

impl Drop for StdinSeverMonitor {
    fn drop(&mut self) {
        // The thread blocks forever on stdin reads and is never joined; the process either exits
        // from inside the thread or shuts down normally with the thread still parked.
        self.handle.take();
    }
}
