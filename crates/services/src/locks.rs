//! Per-student async locks.
//!
//! Profile stats and badge trees are rows owned by one student, so every
//! read-modify-write of them runs under that student's lock. Idle slots are
//! evicted when the last guard drops.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use quiz_core::model::StudentId;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slots = Arc<StdMutex<HashMap<StudentId, Arc<Mutex<()>>>>>;

#[derive(Debug, Clone, Default)]
pub struct StudentLocks {
    slots: Slots,
}

impl StudentLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `student_id`'s rows.
    pub async fn lock(&self, student_id: &StudentId) -> StudentGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(student_id.clone()).or_default())
        };
        let guard = slot.lock_owned().await;
        StudentGuard {
            student_id: student_id.clone(),
            guard: Some(guard),
            slots: Arc::clone(&self.slots),
        }
    }

    /// Number of students with a live slot.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Held while a student's rows are being read and rewritten.
#[derive(Debug)]
pub struct StudentGuard {
    student_id: StudentId,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Slots,
}

impl StudentGuard {
    #[must_use]
    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }
}

impl Drop for StudentGuard {
    fn drop(&mut self) {
        // release first so the map holds the only reference when idle
        drop(self.guard.take());
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots
            .get(&self.student_id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.student_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn idle_slots_are_evicted() {
        let locks = StudentLocks::new();
        for n in 0..16 {
            let guard = locks.lock(&StudentId::new(format!("s{n}"))).await;
            assert_eq!(locks.tracked(), 1);
            drop(guard);
        }
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn slot_survives_while_someone_waits() {
        let locks = StudentLocks::new();
        let student = StudentId::new("s1");
        let first = locks.lock(&student).await;

        let waiter = {
            let locks = locks.clone();
            let student = student.clone();
            tokio::spawn(async move {
                let guard = locks.lock(&student).await;
                guard.student_id().clone()
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(first);

        assert_eq!(waiter.await.unwrap(), student);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn same_student_is_serialized() {
        let locks = StudentLocks::new();
        let student = StudentId::new("s1");
        let held = locks.lock(&student).await;

        let other = StudentId::new("s2");
        // a different student is never blocked
        let _free = tokio::time::timeout(Duration::from_millis(5), locks.lock(&other))
            .await
            .unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(5), locks.lock(&student)).await;
        assert!(blocked.is_err());
        drop(held);
    }
}
