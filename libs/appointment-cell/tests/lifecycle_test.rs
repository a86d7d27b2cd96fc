use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use appointment_cell::models::{
    Actor, Appointment, AppointmentAction, AppointmentError, AppointmentPatch, AppointmentStatus,
    CreateAppointmentRequest, StatusTransition,
};
use appointment_cell::services::{
    AppointmentBookingService, AppointmentLifecycleService, AppointmentStore, FixedClock,
    InMemoryAppointmentStore,
};

struct Harness {
    clock: Arc<FixedClock>,
    service: Arc<AppointmentBookingService>,
    patient: Actor,
    doctor: Actor,
}

fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
}

fn harness(now: DateTime<Utc>) -> Harness {
    let clock = Arc::new(FixedClock::new(now));
    let store = Arc::new(InMemoryAppointmentStore::new(clock.clone()));
    let service = Arc::new(AppointmentBookingService::with_store(store, clock.clone()));

    Harness {
        clock,
        service,
        patient: Actor::patient(Uuid::new_v4()),
        doctor: Actor::doctor(Uuid::new_v4()),
    }
}

impl Harness {
    fn request(&self, scheduled_at: DateTime<Utc>) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            patient_id: Some(self.patient.user_id),
            doctor_id: Some(self.doctor.user_id),
            scheduled_at,
            reason: "Recurring migraines".to_string(),
        }
    }

    async fn create(&self, scheduled_at: DateTime<Utc>) -> Appointment {
        self.service
            .create_appointment(self.request(scheduled_at), &self.patient)
            .await
            .expect("appointment should be created")
    }

    async fn apply(&self, action: AppointmentAction, id: Uuid) -> Result<Appointment, AppointmentError> {
        let service = &self.service;
        match action {
            AppointmentAction::Book => service.book_appointment(id, &self.doctor).await,
            AppointmentAction::Accept => service.accept_appointment(id, &self.doctor).await,
            AppointmentAction::Reject => service.reject_appointment(id, &self.doctor).await,
            AppointmentAction::Reschedule => {
                let new_time = self.clock_now() + Duration::days(1);
                service.reschedule_appointment(id, new_time, &self.patient).await
            }
            AppointmentAction::Cancel => service.cancel_appointment(id, &self.patient).await,
            AppointmentAction::Complete => service.complete_appointment(id, &self.doctor).await,
        }
    }

    fn clock_now(&self) -> DateTime<Utc> {
        use appointment_cell::services::Clock;
        self.clock.now()
    }

    /// Creates an appointment and walks it into `status` through the service.
    async fn create_in(&self, status: AppointmentStatus) -> Appointment {
        let created = self.create(self.clock_now() + Duration::hours(2)).await;
        let id = created.id;
        let service = &self.service;

        match status {
            AppointmentStatus::Pending => created,
            AppointmentStatus::Booked => service.book_appointment(id, &self.doctor).await.unwrap(),
            AppointmentStatus::Accepted => service.accept_appointment(id, &self.doctor).await.unwrap(),
            AppointmentStatus::Rejected => service.reject_appointment(id, &self.doctor).await.unwrap(),
            AppointmentStatus::Cancelled => service.cancel_appointment(id, &self.patient).await.unwrap(),
            AppointmentStatus::Rescheduled => {
                service.accept_appointment(id, &self.doctor).await.unwrap();
                let new_time = self.clock_now() + Duration::days(2);
                service.reschedule_appointment(id, new_time, &self.patient).await.unwrap()
            }
            AppointmentStatus::Completed => {
                service.accept_appointment(id, &self.doctor).await.unwrap();
                self.clock.advance(Duration::hours(3));
                service.complete_appointment(id, &self.doctor).await.unwrap()
            }
        }
    }

    async fn assert_history_is_legal(&self, id: Uuid) {
        let engine = AppointmentLifecycleService::new();
        let history = self.service.appointment_history(id, &self.patient).await.unwrap();
        for transition in history {
            assert!(
                engine.is_legal_transition(transition.from, transition.to),
                "illegal transition recorded: {} -> {}",
                transition.from,
                transition.to
            );
        }
    }
}

#[tokio::test]
async fn test_accept_reschedule_accept_scenario() {
    let h = harness(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap());

    let created = h.create(ts(1, 10)).await;
    assert_eq!(created.status, AppointmentStatus::Pending);

    let accepted = h.service.accept_appointment(created.id, &h.doctor).await.unwrap();
    assert_eq!(accepted.status, AppointmentStatus::Accepted);

    let rescheduled = h
        .service
        .reschedule_appointment(created.id, ts(2, 10), &h.patient)
        .await
        .unwrap();
    assert_eq!(rescheduled.status, AppointmentStatus::Rescheduled);
    assert_eq!(rescheduled.scheduled_at, ts(2, 10));
    assert_eq!(rescheduled.id, created.id);

    let reaccepted = h.service.accept_appointment(created.id, &h.doctor).await.unwrap();
    assert_eq!(reaccepted.status, AppointmentStatus::Accepted);
    assert_eq!(reaccepted.scheduled_at, ts(2, 10));

    let history = h.service.appointment_history(created.id, &h.doctor).await.unwrap();
    let edges: Vec<_> = history.iter().map(|t| (t.from, t.to)).collect();
    assert_eq!(
        edges,
        vec![
            (AppointmentStatus::Pending, AppointmentStatus::Accepted),
            (AppointmentStatus::Accepted, AppointmentStatus::Rescheduled),
            (AppointmentStatus::Rescheduled, AppointmentStatus::Accepted),
        ]
    );
}

#[tokio::test]
async fn test_reject_is_terminal() {
    let h = harness(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap());
    let created = h.create(ts(1, 10)).await;

    let rejected = h.service.reject_appointment(created.id, &h.doctor).await.unwrap();
    assert_eq!(rejected.status, AppointmentStatus::Rejected);

    assert_matches!(
        h.service.accept_appointment(created.id, &h.doctor).await,
        Err(AppointmentError::IllegalTransition {
            from: AppointmentStatus::Rejected,
            action: AppointmentAction::Accept
        })
    );
}

#[tokio::test]
async fn test_cancel_twice() {
    let h = harness(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap());
    let created = h.create(ts(1, 10)).await;

    assert_ok!(h.service.cancel_appointment(created.id, &h.patient).await);
    assert_matches!(
        h.service.cancel_appointment(created.id, &h.doctor).await,
        Err(AppointmentError::IllegalTransition { from: AppointmentStatus::Cancelled, .. })
    );

    let stored = h.service.get_appointment(created.id, &h.patient).await.unwrap();
    assert_eq!(stored.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn test_reschedule_into_past_never_mutates() {
    let h = harness(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap());
    let created = h.create(ts(1, 10)).await;
    let accepted = h.service.accept_appointment(created.id, &h.doctor).await.unwrap();

    for past in [
        Utc.with_ymd_and_hms(2025, 5, 19, 12, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap(),
    ] {
        assert_matches!(
            h.service.reschedule_appointment(created.id, past, &h.patient).await,
            Err(AppointmentError::ValidationError(_))
        );
    }

    let stored = h.service.get_appointment(created.id, &h.patient).await.unwrap();
    assert_eq!(stored, accepted);
}

#[tokio::test]
async fn test_past_reschedule_is_a_validation_error_in_every_status() {
    for status in AppointmentStatus::ALL {
        let h = harness(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap());
        let before = h.create_in(status).await;
        assert_eq!(before.status, status);

        let past = h.clock_now() - Duration::days(1);
        for actor in [h.patient, h.doctor] {
            assert_matches!(
                h.service.reschedule_appointment(before.id, past, &actor).await,
                Err(AppointmentError::ValidationError(_)),
                "reschedule from {}",
                status
            );
        }

        let after = h.service.get_appointment(before.id, &h.patient).await.unwrap();
        assert_eq!(after, before);
    }
}

#[tokio::test]
async fn test_complete_only_after_scheduled_time() {
    let h = harness(Utc.with_ymd_and_hms(2025, 5, 31, 0, 0, 0).unwrap());
    let created = h.create(ts(1, 10)).await;
    h.service.accept_appointment(created.id, &h.doctor).await.unwrap();

    assert_matches!(
        h.service.complete_appointment(created.id, &h.doctor).await,
        Err(AppointmentError::TooEarly { scheduled_at }) if scheduled_at == ts(1, 10)
    );
    assert_eq!(
        h.service.get_appointment(created.id, &h.doctor).await.unwrap().status,
        AppointmentStatus::Accepted
    );

    h.clock.set(ts(1, 10) + Duration::minutes(45));
    let completed = h.service.complete_appointment(created.id, &h.doctor).await.unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);

    assert_err!(h.service.complete_appointment(created.id, &h.doctor).await);
    assert_err!(h.service.cancel_appointment(created.id, &h.patient).await);
}

#[tokio::test]
async fn test_complete_requires_accepted() {
    let h = harness(Utc.with_ymd_and_hms(2025, 5, 31, 0, 0, 0).unwrap());
    let created = h.create(ts(1, 10)).await;
    h.clock.set(ts(2, 0));

    assert_matches!(
        h.service.complete_appointment(created.id, &h.doctor).await,
        Err(AppointmentError::IllegalTransition { from: AppointmentStatus::Pending, .. })
    );
}

#[tokio::test]
async fn test_create_get_round_trip() {
    let h = harness(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap());
    let request = h.request(ts(3, 15));

    let created = h.service.create_appointment(request.clone(), &h.patient).await.unwrap();
    let fetched = h.service.get_appointment(created.id, &h.patient).await.unwrap();

    assert_eq!(Some(fetched.patient_id), request.patient_id);
    assert_eq!(Some(fetched.doctor_id), request.doctor_id);
    assert_eq!(fetched.scheduled_at, request.scheduled_at);
    assert_eq!(fetched.reason, request.reason);
    assert_eq!(fetched.status, AppointmentStatus::Pending);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_doctor_created_appointments_start_booked() {
    let h = harness(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap());
    let created = h
        .service
        .create_appointment(h.request(ts(4, 9)), &h.doctor)
        .await
        .unwrap();
    assert_eq!(created.status, AppointmentStatus::Booked);

    let rescheduled = h
        .service
        .reschedule_appointment(created.id, ts(5, 9), &h.doctor)
        .await
        .unwrap();
    assert_eq!(rescheduled.status, AppointmentStatus::Rescheduled);
}

#[tokio::test]
async fn test_outsiders_cannot_see_or_touch() {
    let h = harness(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap());
    let created = h.create(ts(1, 10)).await;
    let stranger = Actor::patient(Uuid::new_v4());
    let other_doctor = Actor::doctor(Uuid::new_v4());
    let admin = Actor::admin(Uuid::new_v4());

    assert_matches!(
        h.service.get_appointment(created.id, &stranger).await,
        Err(AppointmentError::Forbidden(_))
    );
    assert_matches!(
        h.service.accept_appointment(created.id, &other_doctor).await,
        Err(AppointmentError::Forbidden(_))
    );
    assert_matches!(
        h.service.list_appointments_for_patient(h.patient.user_id, &stranger).await,
        Err(AppointmentError::Forbidden(_))
    );
    assert_matches!(
        h.service.list_appointments_for_doctor(h.doctor.user_id, &h.patient).await,
        Err(AppointmentError::Forbidden(_))
    );
    assert_matches!(
        h.service.delete_appointment(created.id, &h.doctor).await,
        Err(AppointmentError::Forbidden(_))
    );

    assert_eq!(h.service.list_appointments_for_patient(h.patient.user_id, &admin).await.unwrap().len(), 1);
    assert_ok!(h.service.delete_appointment(created.id, &admin).await);
    assert_matches!(
        h.service.get_appointment(created.id, &admin).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn test_role_views_are_ordered() {
    let h = harness(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap());
    for day in [3, 1, 2] {
        h.create(ts(day, 10)).await;
    }

    let patient_view = h
        .service
        .list_appointments_for_patient(h.patient.user_id, &h.patient)
        .await
        .unwrap();
    let patient_days: Vec<_> = patient_view.iter().map(|a| a.scheduled_at).collect();
    assert_eq!(patient_days, vec![ts(3, 10), ts(2, 10), ts(1, 10)]);

    let doctor_view = h
        .service
        .list_appointments_for_doctor(h.doctor.user_id, &h.doctor)
        .await
        .unwrap();
    let doctor_days: Vec<_> = doctor_view.iter().map(|a| a.scheduled_at).collect();
    assert_eq!(doctor_days, vec![ts(1, 10), ts(2, 10), ts(3, 10)]);
}

#[tokio::test]
async fn test_every_action_sequence_stays_on_legal_edges() {
    let h = harness(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap());
    let engine = AppointmentLifecycleService::new();

    for first in AppointmentAction::ALL {
        for second in AppointmentAction::ALL {
            for third in AppointmentAction::ALL {
                let created = h.create(h.clock_now() + Duration::hours(1)).await;
                let mut status = created.status;

                for action in [first, second, third] {
                    let legal = engine.is_legal_transition(status, action.target_status());
                    match h.apply(action, created.id).await {
                        Ok(updated) => {
                            assert!(legal, "{} from {} should have failed", action, status);
                            assert_eq!(updated.status, action.target_status());
                            status = updated.status;
                        }
                        Err(AppointmentError::IllegalTransition { from, .. }) => {
                            assert!(!legal, "{} from {} should have succeeded", action, status);
                            assert_eq!(from, status);
                        }
                        Err(AppointmentError::TooEarly { .. }) => {
                            assert_eq!(action, AppointmentAction::Complete);
                        }
                        Err(other) => panic!("unexpected error {:?}", other),
                    }
                }

                h.assert_history_is_legal(created.id).await;
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accept_and_cancel_stay_consistent() {
    let h = harness(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap());
    let engine = AppointmentLifecycleService::new();

    for _ in 0..50 {
        let created = h.create(ts(1, 10)).await;

        let accept = {
            let service = h.service.clone();
            let doctor = h.doctor;
            tokio::spawn(async move { service.accept_appointment(created.id, &doctor).await })
        };
        let cancel = {
            let service = h.service.clone();
            let patient = h.patient;
            tokio::spawn(async move { service.cancel_appointment(created.id, &patient).await })
        };

        let results: Vec<_> = futures::future::join_all([accept, cancel])
            .await
            .into_iter()
            .map(|joined| joined.expect("task panicked"))
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert!(successes >= 1);
        for result in &results {
            assert_matches!(
                result,
                Ok(_) | Err(AppointmentError::Conflict) | Err(AppointmentError::IllegalTransition { .. })
            );
        }

        let final_state = h.service.get_appointment(created.id, &h.patient).await.unwrap();
        assert_matches!(
            final_state.status,
            AppointmentStatus::Accepted | AppointmentStatus::Cancelled
        );

        let history = h.service.appointment_history(created.id, &h.patient).await.unwrap();
        assert_eq!(history.len(), successes);
        assert!(history.iter().all(|t| engine.is_legal_transition(t.from, t.to)));
        assert_eq!(history.last().map(|t| t.to), Some(final_state.status));
    }
}

/// Store that lets another writer commit a patch right after the next read.
struct InterleavingStore {
    inner: InMemoryAppointmentStore,
    interloper: Mutex<Option<AppointmentPatch>>,
}

#[async_trait]
impl AppointmentStore for InterleavingStore {
    async fn create(
        &self,
        request: CreateAppointmentRequest,
        initial_status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        self.inner.create(request, initial_status).await
    }

    async fn get(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        let read = self.inner.get(id).await?;
        let interloper = self.interloper.lock().unwrap().take();
        if let Some(patch) = interloper {
            self.inner.update(id, patch).await?;
        }
        Ok(read)
    }

    async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.inner.list_by_patient(patient_id).await
    }

    async fn list_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.inner.list_by_doctor(doctor_id).await
    }

    async fn update(&self, id: Uuid, patch: AppointmentPatch) -> Result<Appointment, AppointmentError> {
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppointmentError> {
        self.inner.delete(id).await
    }

    async fn transitions(&self, id: Uuid) -> Result<Vec<StatusTransition>, AppointmentError> {
        self.inner.transitions(id).await
    }
}

#[tokio::test]
async fn test_write_after_interleaved_commit_is_rejected() {
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 5, 20, 0, 0, 0).unwrap()));
    let store = Arc::new(InterleavingStore {
        inner: InMemoryAppointmentStore::new(clock.clone()),
        interloper: Mutex::new(None),
    });
    let service = AppointmentBookingService::with_store(store.clone(), clock.clone());

    let patient = Actor::patient(Uuid::new_v4());
    let doctor = Actor::doctor(Uuid::new_v4());
    let request = CreateAppointmentRequest {
        patient_id: Some(patient.user_id),
        doctor_id: Some(doctor.user_id),
        scheduled_at: ts(1, 10),
        reason: String::new(),
    };
    let created = service.create_appointment(request, &patient).await.unwrap();

    // The cancel lands between the accept's read and its commit
    *store.interloper.lock().unwrap() = Some(AppointmentPatch {
        status: Some(AppointmentStatus::Cancelled),
        ..Default::default()
    });

    assert_matches!(
        service.accept_appointment(created.id, &doctor).await,
        Err(AppointmentError::Conflict)
    );

    let stored = store.inner.get(created.id).await.unwrap();
    assert_eq!(stored.status, AppointmentStatus::Cancelled);
    assert_eq!(stored.version, created.version + 1);

    let history = store.inner.transitions(created.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].to, AppointmentStatus::Cancelled);

    // A fresh read sees the cancellation and the accept is no longer legal
    assert_matches!(
        service.accept_appointment(created.id, &doctor).await,
        Err(AppointmentError::IllegalTransition { from: AppointmentStatus::Cancelled, .. })
    );
}
