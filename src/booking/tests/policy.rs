use super::common::*;
use crate::booking::domain::{LessonStatus, LessonType};
use crate::booking::policy::{AdmissionError, AdmissionPolicy, PolicyConfig};

fn policy() -> AdmissionPolicy {
    AdmissionPolicy::new(PolicyConfig::default())
}

fn policy_with_default_capacity(default_group_capacity: u32) -> AdmissionPolicy {
    AdmissionPolicy::new(PolicyConfig {
        default_group_capacity,
    })
}

#[test]
fn validation_rejects_blank_fields() {
    let policy = policy();

    let mut request = one_on_one_request(teacher(), student(1), at(10, 0), 60);
    request.teacher_id.0 = "  ".to_string();
    assert!(matches!(
        policy.validate(&request, base_now()),
        Err(AdmissionError::InvalidRequest(message)) if message.contains("teacher_id")
    ));

    let mut request = one_on_one_request(teacher(), student(1), at(10, 0), 60);
    request.subject = String::new();
    assert!(matches!(
        policy.validate(&request, base_now()),
        Err(AdmissionError::InvalidRequest(message)) if message.contains("subject")
    ));
}

#[test]
fn validation_rejects_zero_duration() {
    let request = one_on_one_request(teacher(), student(1), at(10, 0), 0);
    assert!(matches!(
        policy().validate(&request, base_now()),
        Err(AdmissionError::InvalidRequest(message)) if message.contains("duration")
    ));
}

#[test]
fn validation_rejects_starts_in_the_past() {
    let request = one_on_one_request(teacher(), student(1), at(7, 0), 60);
    assert!(matches!(
        policy().validate(&request, base_now()),
        Err(AdmissionError::InvalidRequest(message)) if message.contains("future")
    ));
}

#[test]
fn one_on_one_rejects_any_overlap() {
    // Teacher holds a scheduled one-on-one 14:00-15:00; a 14:30-15:30
    // request must bounce.
    let policy = policy();
    let request = one_on_one_request(teacher(), student(2), at(14, 30), 60);
    let interval = policy.validate(&request, base_now()).expect("valid request");
    let existing = vec![commitment(
        1,
        teacher(),
        student(1),
        at(14, 0),
        60,
        LessonType::OneOnOne,
        LessonStatus::Scheduled,
    )];

    assert!(matches!(
        policy.evaluate(&request, interval, &[], &existing, None),
        Err(AdmissionError::TeacherSlotTaken)
    ));
}

#[test]
fn one_on_one_admits_back_to_back_lessons() {
    let policy = policy();
    let request = one_on_one_request(teacher(), student(2), at(15, 0), 60);
    let interval = policy.validate(&request, base_now()).expect("valid request");
    let existing = vec![commitment(
        1,
        teacher(),
        student(1),
        at(14, 0),
        60,
        LessonType::OneOnOne,
        LessonStatus::Scheduled,
    )];

    policy
        .evaluate(&request, interval, &[], &existing, None)
        .expect("touching endpoints do not conflict");
}

#[test]
fn pending_lessons_still_occupy_the_teacher() {
    let policy = policy();
    let request = one_on_one_request(teacher(), student(2), at(14, 0), 60);
    let interval = policy.validate(&request, base_now()).expect("valid request");
    let existing = vec![commitment(
        1,
        teacher(),
        student(1),
        at(14, 0),
        60,
        LessonType::OneOnOne,
        LessonStatus::Pending,
    )];

    assert!(matches!(
        policy.evaluate(&request, interval, &[], &existing, None),
        Err(AdmissionError::TeacherSlotTaken)
    ));
}

#[test]
fn cancelled_and_rejected_lessons_release_the_slot() {
    let policy = policy();
    let request = one_on_one_request(teacher(), student(2), at(14, 0), 60);
    let interval = policy.validate(&request, base_now()).expect("valid request");
    let existing = vec![
        commitment(
            1,
            teacher(),
            student(1),
            at(14, 0),
            60,
            LessonType::OneOnOne,
            LessonStatus::Cancelled,
        ),
        commitment(
            2,
            teacher(),
            student(3),
            at(14, 0),
            60,
            LessonType::OneOnOne,
            LessonStatus::Rejected,
        ),
    ];

    policy
        .evaluate(&request, interval, &[], &existing, None)
        .expect("released slots are bookable again");
}

#[test]
fn student_double_booking_rejected_across_teachers() {
    // Student already has 09:00-10:00 with teacher 1; 09:30-10:30 with
    // teacher 2 must bounce regardless of the new teacher being free.
    let policy = policy();
    let request = one_on_one_request(other_teacher(), student(1), at(9, 30), 60);
    let interval = policy.validate(&request, base_now()).expect("valid request");
    let student_commitments = vec![commitment(
        1,
        teacher(),
        student(1),
        at(9, 0),
        60,
        LessonType::OneOnOne,
        LessonStatus::Scheduled,
    )];

    assert!(matches!(
        policy.evaluate(&request, interval, &student_commitments, &[], None),
        Err(AdmissionError::StudentDoubleBooked)
    ));
}

#[test]
fn student_double_booking_applies_to_group_lessons_too() {
    let policy = policy();
    let request = group_request(other_teacher(), student(1), at(9, 30), 60);
    let interval = policy.validate(&request, base_now()).expect("valid request");
    let student_commitments = vec![commitment(
        1,
        teacher(),
        student(1),
        at(9, 0),
        60,
        LessonType::Group,
        LessonStatus::Scheduled,
    )];

    assert!(matches!(
        policy.evaluate(&request, interval, &student_commitments, &[], None),
        Err(AdmissionError::StudentDoubleBooked)
    ));
}

#[test]
fn group_request_rejected_when_one_on_one_holds_the_same_slot() {
    let policy = policy();
    let request = group_request(teacher(), student(2), at(10, 0), 60);
    let interval = policy.validate(&request, base_now()).expect("valid request");
    let existing = vec![commitment(
        1,
        teacher(),
        student(1),
        at(10, 0),
        60,
        LessonType::OneOnOne,
        LessonStatus::Scheduled,
    )];

    assert!(matches!(
        policy.evaluate(&request, interval, &[], &existing, None),
        Err(AdmissionError::TeacherSlotTaken)
    ));
}

#[test]
fn group_request_rejected_on_foreign_overlap() {
    // A partially overlapping group lesson is never mergeable.
    let policy = policy();
    let request = group_request(teacher(), student(2), at(10, 0), 60);
    let interval = policy.validate(&request, base_now()).expect("valid request");
    let existing = vec![commitment(
        1,
        teacher(),
        student(1),
        at(10, 30),
        60,
        LessonType::Group,
        LessonStatus::Scheduled,
    )];

    assert!(matches!(
        policy.evaluate(&request, interval, &[], &existing, None),
        Err(AdmissionError::TeacherSlotTaken)
    ));
}

#[test]
fn group_capacity_admits_until_full() {
    // Slot 10:00-11:00 with capacity 3 and two existing group bookings: the
    // third is admitted, the fourth bounces.
    let policy = policy();
    let slot = group_slot(teacher(), at(10, 0), 60, 3);
    let two_booked = vec![
        commitment(
            1,
            teacher(),
            student(1),
            at(10, 0),
            60,
            LessonType::Group,
            LessonStatus::Scheduled,
        ),
        commitment(
            2,
            teacher(),
            student(2),
            at(10, 0),
            60,
            LessonType::Group,
            LessonStatus::Scheduled,
        ),
    ];

    let third = group_request(teacher(), student(3), at(10, 0), 60);
    let interval = policy.validate(&third, base_now()).expect("valid request");
    let grant = policy
        .evaluate(&third, interval, &[], &two_booked, Some(&slot))
        .expect("third seat fits");
    assert_eq!(grant.same_slot_peers, 2);

    let mut three_booked = two_booked;
    three_booked.push(commitment(
        3,
        teacher(),
        student(3),
        at(10, 0),
        60,
        LessonType::Group,
        LessonStatus::Scheduled,
    ));
    let fourth = group_request(teacher(), student(4), at(10, 0), 60);
    assert!(matches!(
        policy.evaluate(&fourth, interval, &[], &three_booked, Some(&slot)),
        Err(AdmissionError::CapacityFull { capacity: 3 })
    ));
}

#[test]
fn missing_slot_falls_back_to_configured_default_capacity() {
    let tight = policy_with_default_capacity(2);
    let request = group_request(teacher(), student(3), at(10, 0), 60);
    let interval = tight.validate(&request, base_now()).expect("valid request");
    let existing = vec![
        commitment(
            1,
            teacher(),
            student(1),
            at(10, 0),
            60,
            LessonType::Group,
            LessonStatus::Scheduled,
        ),
        commitment(
            2,
            teacher(),
            student(2),
            at(10, 0),
            60,
            LessonType::Group,
            LessonStatus::Scheduled,
        ),
    ];

    assert!(matches!(
        tight.evaluate(&request, interval, &[], &existing, None),
        Err(AdmissionError::CapacityFull { capacity: 2 })
    ));

    let roomy = policy();
    roomy
        .evaluate(&request, interval, &[], &existing, None)
        .expect("default capacity of 10 leaves room");
}

#[test]
fn rejection_reasons_carry_stable_codes() {
    assert_eq!(
        AdmissionError::StudentDoubleBooked.kind().code(),
        "student_double_booked"
    );
    assert_eq!(
        AdmissionError::CapacityFull { capacity: 3 }.kind().code(),
        "capacity_full"
    );
    assert!(!AdmissionError::TeacherSlotTaken.is_retryable_verbatim());
    assert!(AdmissionError::PersistenceFailure("down".to_string()).is_retryable_verbatim());
}
