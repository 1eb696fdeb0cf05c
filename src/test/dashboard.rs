#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveTime, Utc};

    use crate::dashboard::{month_bounds, summarize};
    use crate::models::{
        Announcement, NewAnnouncement, NewRecord, NewSchedule, Priority, Record, Schedule,
        ScheduleType, TrackEvent, Unit,
    };
    use crate::store::ResourceStore;
    use crate::test::test_db::TestDb;
    use crate::test::test_utils::create_standard_test_db;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn add_schedule(db: &TestDb, title: &str, date: NaiveDate, start: u32) -> Schedule {
        db.store()
            .insert(NewSchedule {
                title: title.to_string(),
                description: String::new(),
                date,
                start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(start + 1, 0, 0).unwrap(),
                location: "Track".to_string(),
                schedule_type: ScheduleType::Practice,
                created_by: db.user_id("C2001"),
                created_at: Utc::now().naive_utc(),
            })
            .await
            .unwrap()
    }

    async fn add_record(db: &TestDb, date: NaiveDate) -> Record {
        db.store()
            .insert(NewRecord {
                student_id: "S1001".to_string(),
                student_name: "Aoi Tanaka".to_string(),
                event: TrackEvent::ShotPut,
                record_value: "9.50".to_string(),
                unit: Unit::Meters,
                date,
                location: String::new(),
                competition_name: None,
                notes: None,
                is_personal_best: false,
                created_at: Utc::now().naive_utc(),
            })
            .await
            .unwrap()
    }

    async fn add_announcement(db: &TestDb, days_ago: i64) -> Announcement {
        let at = Utc::now().naive_utc() - Duration::days(days_ago);
        db.store()
            .insert(NewAnnouncement {
                title: format!("{} days ago", days_ago),
                content: "Notice".to_string(),
                author_id: db.user_id("C2001"),
                author_name: "Coach Sato".to_string(),
                priority: Priority::Low,
                attachment_url: None,
                created_at: at,
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(
            month_bounds(ymd(2024, 2, 29)).unwrap(),
            (ymd(2024, 2, 1), ymd(2024, 3, 1))
        );
        assert_eq!(
            month_bounds(ymd(2024, 12, 31)).unwrap(),
            (ymd(2024, 12, 1), ymd(2025, 1, 1))
        );
    }

    #[rocket::async_test]
    async fn test_summary_counts() {
        let db = create_standard_test_db().await;
        let today = ymd(2024, 9, 14);

        add_schedule(&db, "yesterday", ymd(2024, 9, 13), 16).await;
        add_schedule(&db, "evening", today, 18).await;
        add_schedule(&db, "morning", today, 7).await;
        add_schedule(&db, "next week", ymd(2024, 9, 21), 9).await;

        add_record(&db, ymd(2024, 8, 31)).await;
        add_record(&db, ymd(2024, 9, 1)).await;
        add_record(&db, ymd(2024, 9, 30)).await;
        add_record(&db, ymd(2024, 10, 1)).await;

        add_announcement(&db, 0).await;
        add_announcement(&db, 3).await;
        add_announcement(&db, 30).await;

        let summary = summarize(&db.store(), today, Utc::now().naive_utc())
            .await
            .unwrap();

        let todays: Vec<&str> = summary
            .todays_schedules
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(todays, vec!["morning", "evening"]);
        assert_eq!(summary.upcoming_schedule_count, 3);
        assert_eq!(summary.records_this_month, 2);
        assert_eq!(summary.recent_announcement_count, 2);
        assert_eq!(summary.member_count, 5);
    }
}
