//! Connectivity monitor
//!
//! Tracks whether the station currently holds a usable network address. The
//! flag is written from the network event context and awaited by the
//! reporting loop; nothing else is shared between the two.

use core::future::poll_fn;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::Poll;

use embassy_futures::select::{Either, select};
use embassy_sync::waitqueue::AtomicWaker;
use embassy_time::{Duration, Timer};
use log::{debug, info};

/// Network events the monitor reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    /// The Wi-Fi station interface came up
    StationStarted,
    /// The station lost its association
    StationDisconnected,
    /// DHCP handed out an address
    AddressAcquired,
}

/// Follow-up the network glue should perform for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkAction {
    /// Start a (re)connect attempt; the result is not tracked here.
    Connect,
}

/// Binary connectivity flag with an async "wait until connected".
///
/// Intended to live in a `static` and be shared by reference between the
/// network event task and the reporting loop. Only one task may wait on it.
pub struct Connectivity {
    connected: AtomicBool,
    waker: AtomicWaker,
}

impl Connectivity {
    pub const fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            waker: AtomicWaker::new(),
        }
    }

    /// Apply a network event and report what the glue should do next.
    pub fn handle_event(&self, event: NetworkEvent) -> Option<NetworkAction> {
        match event {
            NetworkEvent::StationStarted => Some(NetworkAction::Connect),
            NetworkEvent::StationDisconnected => {
                if self.connected.swap(false, Ordering::AcqRel) {
                    info!("Network connection lost");
                }
                Some(NetworkAction::Connect)
            }
            NetworkEvent::AddressAcquired => {
                if !self.connected.swap(true, Ordering::AcqRel) {
                    info!("Network address acquired");
                } else {
                    debug!("Address acquired while already connected");
                }
                self.waker.wake();
                None
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Wait until an address has been acquired.
    ///
    /// Returns immediately when already connected. There is no timeout: if
    /// the network never attaches this never completes.
    pub async fn wait_connected(&self) {
        poll_fn(|cx| {
            self.waker.register(cx.waker());
            if self.is_connected() {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}

/// Association state of the Wi-Fi station as seen by the network glue.
pub trait StationLink {
    /// Whether the station is associated right now.
    fn is_associated(&self) -> bool;

    /// Resolves on the next disconnect event. Events raised before the call
    /// may be lost.
    fn disconnected(&mut self) -> impl Future<Output = ()>;
}

/// Wait until `link` is no longer associated.
///
/// The disconnect event alone can be missed when it fires between the
/// association completing and the wait starting, so the association state is
/// re-checked every `poll_interval` as well.
pub async fn wait_for_link_loss<L: StationLink>(link: &mut L, poll_interval: Duration) {
    loop {
        if !link.is_associated() {
            return;
        }
        if let Either::First(()) = select(link.disconnected(), Timer::after(poll_interval)).await {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::join::join;
    use futures::executor::block_on;

    #[test]
    fn test_start_and_disconnect_request_connect() {
        let connectivity = Connectivity::new();
        assert_eq!(
            connectivity.handle_event(NetworkEvent::StationStarted),
            Some(NetworkAction::Connect)
        );
        assert!(!connectivity.is_connected());

        connectivity.handle_event(NetworkEvent::AddressAcquired);
        assert!(connectivity.is_connected());

        assert_eq!(
            connectivity.handle_event(NetworkEvent::StationDisconnected),
            Some(NetworkAction::Connect)
        );
        assert!(!connectivity.is_connected());
    }

    #[test]
    fn test_repeated_address_events_are_idempotent() {
        let connectivity = Connectivity::new();
        assert_eq!(connectivity.handle_event(NetworkEvent::AddressAcquired), None);
        assert_eq!(connectivity.handle_event(NetworkEvent::AddressAcquired), None);
        assert!(connectivity.is_connected());
    }

    #[test]
    fn test_wait_returns_immediately_when_connected() {
        let connectivity = Connectivity::new();
        connectivity.handle_event(NetworkEvent::AddressAcquired);
        block_on(connectivity.wait_connected());
    }

    #[test]
    fn test_wait_blocks_until_address_acquired() {
        let connectivity = Connectivity::new();
        connectivity.handle_event(NetworkEvent::StationStarted);

        block_on(join(connectivity.wait_connected(), async {
            Timer::after(Duration::from_millis(20)).await;
            assert!(!connectivity.is_connected());
            connectivity.handle_event(NetworkEvent::AddressAcquired);
        }));

        assert!(connectivity.is_connected());
    }

    #[test]
    fn test_wait_blocks_again_after_disconnect() {
        let connectivity = Connectivity::new();
        connectivity.handle_event(NetworkEvent::AddressAcquired);
        block_on(connectivity.wait_connected());

        connectivity.handle_event(NetworkEvent::StationDisconnected);
        let outcome = block_on(select(
            connectivity.wait_connected(),
            Timer::after(Duration::from_millis(20)),
        ));
        assert!(matches!(outcome, Either::Second(())));

        block_on(join(connectivity.wait_connected(), async {
            Timer::after(Duration::from_millis(20)).await;
            connectivity.handle_event(NetworkEvent::AddressAcquired);
        }));
        assert!(connectivity.is_connected());
    }

    /// Link whose disconnect event was raised before anyone listened.
    struct MissedEventLink {
        associated_polls: u32,
        event_waits: u32,
    }

    impl StationLink for MissedEventLink {
        fn is_associated(&self) -> bool {
            self.event_waits < self.associated_polls
        }

        async fn disconnected(&mut self) {
            self.event_waits += 1;
            core::future::pending::<()>().await
        }
    }

    #[test]
    fn test_link_loss_is_seen_without_the_event() {
        let mut link = MissedEventLink {
            associated_polls: 2,
            event_waits: 0,
        };
        block_on(wait_for_link_loss(&mut link, Duration::from_millis(5)));
        assert_eq!(link.event_waits, 2);
    }

    #[test]
    fn test_link_loss_returns_on_event() {
        struct EventLink {
            fired: bool,
        }

        impl StationLink for EventLink {
            fn is_associated(&self) -> bool {
                !self.fired
            }

            async fn disconnected(&mut self) {
                Timer::after(Duration::from_millis(5)).await;
                self.fired = true;
            }
        }

        let mut link = EventLink { fired: false };
        let outcome = block_on(select(
            wait_for_link_loss(&mut link, Duration::from_secs(60)),
            Timer::after(Duration::from_secs(5)),
        ));
        assert!(matches!(outcome, Either::First(())));
    }
}
