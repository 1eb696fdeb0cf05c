#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, Utc};

    use crate::error::AppError;
    use crate::models::{
        NewRecord, NewSchedule, Record, RecordChanges, Schedule, ScheduleType, TrackEvent, Unit,
    };
    use crate::store::{Filter, ResourceStore, SortDirection, SortKey};
    use crate::test::test_utils::create_standard_test_db;

    fn new_record(student_id: &str, event: TrackEvent, value: &str, date: NaiveDate) -> NewRecord {
        NewRecord {
            student_id: student_id.to_string(),
            student_name: "Someone".to_string(),
            event,
            record_value: value.to_string(),
            unit: Unit::Seconds,
            date,
            location: String::new(),
            competition_name: None,
            notes: None,
            is_personal_best: false,
            created_at: Utc::now().naive_utc(),
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[rocket::async_test]
    async fn test_equality_filters() {
        let db = create_standard_test_db().await;
        let store = db.store();

        for (sid, event, value) in [
            ("S1001", TrackEvent::Sprint100, "11.50"),
            ("S1001", TrackEvent::Sprint200, "23.40"),
            ("S1002", TrackEvent::Sprint100, "11.90"),
        ] {
            ResourceStore::<Record>::insert(&store, new_record(sid, event, value, date(1)))
                .await
                .unwrap();
        }

        let order = [SortKey::new("date", SortDirection::Descending)];

        let s1: Vec<Record> = store
            .query(&Filter::new().eq("student_id", "S1001"), &order)
            .await
            .unwrap();
        assert_eq!(s1.len(), 2);
        assert!(s1.iter().all(|r| r.student_id == "S1001"));

        let sprints: Vec<Record> = store
            .query(
                &Filter::new()
                    .eq("event", TrackEvent::Sprint100.as_str())
                    .eq("student_id", "S1002"),
                &order,
            )
            .await
            .unwrap();
        assert_eq!(sprints.len(), 1);
        assert_eq!(sprints[0].record_value, "11.90");

        let none: Vec<Record> = store
            .query(&Filter::new().eq("student_id", "S9999"), &order)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[rocket::async_test]
    async fn test_ties_broken_by_id() {
        let db = create_standard_test_db().await;
        let store = db.store();

        let mut ids = Vec::new();
        for value in ["12.00", "12.10", "12.20"] {
            let row: Record = store
                .insert(new_record("S1001", TrackEvent::Sprint100, value, date(2)))
                .await
                .unwrap();
            ids.push(row.id);
        }

        let descending: Vec<i64> = store
            .query(
                &Filter::new(),
                &[SortKey::new("date", SortDirection::Descending)],
            )
            .await
            .unwrap()
            .into_iter()
            .map(|r: Record| r.id)
            .collect();
        ids.reverse();
        assert_eq!(descending, ids);
    }

    #[rocket::async_test]
    async fn test_schedule_times_round_trip_as_hhmm() {
        let db = create_standard_test_db().await;
        let store = db.store();

        let created: Schedule = store
            .insert(NewSchedule {
                title: "Morning run".to_string(),
                description: String::new(),
                date: date(3),
                start_time: NaiveTime::from_hms_opt(6, 30, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(7, 15, 0).unwrap(),
                location: "River path".to_string(),
                schedule_type: ScheduleType::Practice,
                created_by: db.user_id("C2001"),
                created_at: Utc::now().naive_utc(),
            })
            .await
            .unwrap();

        let (start, end): (String, String) =
            sqlx::query_as("SELECT start_time, end_time FROM schedules WHERE id = ?")
                .bind(created.id)
                .fetch_one(&db.pool)
                .await
                .unwrap();
        assert_eq!(start, "06:30");
        assert_eq!(end, "07:15");

        let found: Option<Schedule> = store.find_by_id(created.id).await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[rocket::async_test]
    async fn test_missing_rows() {
        let db = create_standard_test_db().await;
        let store = db.store();

        let found: Option<Record> = store.find_by_id(42).await.unwrap();
        assert!(found.is_none());

        let result = ResourceStore::<Record>::delete_by_id(&store, 42).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let result: Result<Record, AppError> = store
            .update_by_id(
                42,
                RecordChanges {
                    event: TrackEvent::Sprint100,
                    record_value: "11.00".to_string(),
                    unit: Unit::Seconds,
                    date: date(4),
                    location: String::new(),
                    competition_name: None,
                    notes: None,
                    is_personal_best: false,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[rocket::async_test]
    async fn test_record_for_unknown_student_is_rejected() {
        let db = create_standard_test_db().await;
        let store = db.store();

        let result: Result<Record, AppError> = store
            .insert(new_record("NOBODY", TrackEvent::Sprint100, "11.00", date(5)))
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }
}
