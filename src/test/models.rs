#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;
    use validator::Validate;

    use crate::error::AppError;
    use crate::models::{
        AnnouncementPatch, AnnouncementPayload, Priority, RecordPayload, SchedulePatch,
        SchedulePayload, ScheduleType, TrackEvent, Unit, check_time_range, hhmm, is_usual_unit,
    };

    #[test]
    fn test_usual_units_per_event() {
        assert!(is_usual_unit(TrackEvent::Sprint100, Unit::Seconds));
        assert!(is_usual_unit(TrackEvent::Run1500, Unit::Minutes));
        assert!(is_usual_unit(TrackEvent::LongJump, Unit::Meters));

        assert!(!is_usual_unit(TrackEvent::LongJump, Unit::Seconds));
        assert!(!is_usual_unit(TrackEvent::Sprint100, Unit::Meters));
    }

    #[test]
    fn test_record_value_is_free_text() {
        for mark in ["2:05.30", "10.95w", "11.503", "265.3", "DNF"] {
            let payload: RecordPayload = serde_json::from_value(json!({
                "event": "800m",
                "record_value": mark,
                "unit": "seconds",
                "date": "2024-05-01"
            }))
            .unwrap();
            assert!(payload.validate().is_ok(), "{} should be accepted", mark);
        }

        let blank: RecordPayload = serde_json::from_value(json!({
            "event": "800m",
            "record_value": "   ",
            "unit": "seconds",
            "date": "2024-05-01"
        }))
        .unwrap();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_event_codes_and_aliases() {
        assert_eq!("110mH".parse::<TrackEvent>().unwrap(), TrackEvent::Hurdles110);
        assert_eq!("走幅跳".parse::<TrackEvent>().unwrap(), TrackEvent::LongJump);
        assert_eq!("やり投".parse::<TrackEvent>().unwrap(), TrackEvent::JavelinThrow);
        assert!("marathon".parse::<TrackEvent>().is_err());

        assert!(TrackEvent::HammerThrow.is_field_event());
        assert!(!TrackEvent::Steeplechase3000.is_field_event());

        let event: TrackEvent = serde_json::from_value(json!("砲丸投")).unwrap();
        assert_eq!(event, TrackEvent::ShotPut);
        assert_eq!(serde_json::to_value(event).unwrap(), json!("shot_put"));
    }

    #[test]
    fn test_record_payload_defaults() {
        let payload: RecordPayload = serde_json::from_value(json!({
            "event": "100m",
            "record_value": "11.50",
            "unit": "seconds",
            "date": "2024-05-01"
        }))
        .unwrap();

        assert_eq!(payload.location, "");
        assert!(!payload.is_personal_best);
        assert!(payload.validate().is_ok());

        let bad_unit = serde_json::from_value::<RecordPayload>(json!({
            "event": "100m",
            "record_value": "11.50",
            "unit": "furlongs",
            "date": "2024-05-01"
        }));
        assert!(bad_unit.is_err());
    }

    #[test]
    fn test_schedule_times() {
        assert_eq!(
            hhmm::parse("07:30:45"),
            Some(NaiveTime::from_hms_opt(7, 30, 0).unwrap())
        );
        assert_eq!(hhmm::parse("7pm"), None);
        assert_eq!(
            hhmm::format(&NaiveTime::from_hms_opt(9, 5, 0).unwrap()),
            "09:05"
        );

        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert!(check_time_range(at(9, 0), at(10, 0)).is_ok());
        assert!(check_time_range(at(9, 0), at(9, 0)).is_ok());
        assert!(matches!(
            check_time_range(at(10, 0), at(9, 0)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_schedule_payload_shape() {
        let payload: SchedulePayload = serde_json::from_value(json!({
            "title": "Meet",
            "date": "2024-07-07",
            "start_time": "09:00",
            "end_time": "15:00",
            "location": "Prefectural stadium",
            "type": "competition"
        }))
        .unwrap();

        assert_eq!(payload.schedule_type, ScheduleType::Competition);
        assert_eq!(payload.date, NaiveDate::from_ymd_opt(2024, 7, 7).unwrap());
        assert_eq!(payload.description, "");

        let patch: SchedulePatch = serde_json::from_value(json!({ "location": "  " })).unwrap();
        assert!(patch.start_time.is_none());
        assert!(patch.validate().is_err());

        let bad_time = serde_json::from_value::<SchedulePatch>(json!({ "start_time": "25:00" }));
        assert!(bad_time.is_err());
    }

    #[test]
    fn test_announcement_validation() {
        let payload: AnnouncementPayload = serde_json::from_value(json!({
            "title": "Summer camp",
            "content": "Details inside",
            "attachment_url": "not a url"
        }))
        .unwrap();
        assert_eq!(payload.priority, Priority::Medium);

        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("attachment_url"));

        let patch = AnnouncementPatch {
            attachment_url: Some(String::new()),
            ..Default::default()
        };
        assert!(patch.validate().is_ok());

        let blank = AnnouncementPatch {
            content: Some(" \n ".to_string()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());

        assert!(serde_json::from_value::<AnnouncementPatch>(json!({ "priority": "urgent" })).is_err());
    }
}
