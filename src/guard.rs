use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

/// Serializes report generation. The report tab is one shared surface, so
/// every run must hold the global permit, and a phone that is already in
/// flight is turned away instead of being queued a second time.
pub struct ReportGate {
    inflight: Mutex<HashSet<String>>,
    gate: AsyncMutex<()>,
}

/// Proof that one run may use the report tab. Dropping it releases the
/// permit and forgets the phone, on every exit path.
pub struct ReportTicket<'a> {
    owner: &'a ReportGate,
    phone: String,
    permit: Option<MutexGuard<'a, ()>>,
}

impl ReportGate {
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashSet::new()),
            gate: AsyncMutex::new(()),
        }
    }

    /// Registers the phone, then waits for the global permit. Returns None
    /// when the same phone is already registered; other phones queue on the
    /// permit in arrival order.
    pub async fn acquire(&self, phone: &str) -> Option<ReportTicket<'_>> {
        if !self.inflight.lock().unwrap().insert(phone.to_string()) {
            return None;
        }

        // The ticket owns the marker before the wait starts: a duplicate
        // arriving while this one queues is still rejected, and dropping
        // the wait mid-queue still unregisters the phone.
        let mut ticket = ReportTicket {
            owner: self,
            phone: phone.to_string(),
            permit: None,
        };
        ticket.permit = Some(self.gate.lock().await);
        Some(ticket)
    }
}

impl Drop for ReportTicket<'_> {
    fn drop(&mut self) {
        self.permit.take();
        self.owner.inflight.lock().unwrap().remove(&self.phone);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn same_phone_is_rejected_while_in_flight() {
        let gate = ReportGate::new();

        let ticket = gate.acquire("998901234567").await;
        assert!(ticket.is_some());
        assert!(gate.acquire("998901234567").await.is_none());

        drop(ticket);
        assert!(gate.acquire("998901234567").await.is_some());
    }

    #[tokio::test]
    async fn other_phones_queue_until_the_permit_frees_up() {
        let gate = ReportGate::new();
        let first = gate.acquire("998901111111").await;

        let waiting = timeout(Duration::from_millis(50), gate.acquire("998902222222")).await;
        assert!(waiting.is_err());

        drop(first);
        let second = timeout(Duration::from_millis(50), gate.acquire("998902222222"))
            .await
            .expect("permit should be free after the first ticket dropped");
        assert!(second.is_some());
    }

    #[tokio::test]
    async fn abandoned_wait_does_not_leave_the_phone_stuck() {
        let gate = ReportGate::new();
        let first = gate.acquire("998901111111").await;

        // Times out while queued; the dropped wait must unregister the phone.
        let _ = timeout(Duration::from_millis(20), gate.acquire("998902222222")).await;
        drop(first);

        assert!(gate.acquire("998902222222").await.is_some());
    }
}
