//! End-to-end passes over small fleets.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

use crate::aging::AgingLedger;
use crate::config::DispatchConfig;
use crate::error::{DispatchError, FailureReason, PassWarning, SnapshotError};
use crate::models::{
    Address, AvailabilityException, DefaultHours, EquipmentRequirement, EquipmentType, Job,
    JobStatus, ServiceCategory, ServiceDetail, Technician, Van, VehicleKey,
};
use crate::snapshot::{Horizon, OptimizeRequest, Snapshot, SnapshotSource};

use super::{DispatchScheduler, PassResult, PassState};

const WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn t(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

/// Monday 2025-03-03 plus `offset` days, at `hour:minute`.
fn at(offset: u64, hour: u32, minute: u32) -> NaiveDateTime {
    (d(2025, 3, 3) + chrono::Days::new(offset)).and_time(t(hour, minute))
}

fn escape() -> VehicleKey {
    VehicleKey::new(2020, "Ford", "Escape")
}

fn scan_job(id: &str, street: &str, minutes: i64) -> Job {
    Job::new(
        id,
        Address::new(street),
        escape(),
        ServiceDetail::DiagnosticScan,
        minutes,
    )
}

fn module_job(id: &str, street: &str) -> Job {
    Job::new(
        id,
        Address::new(street),
        escape(),
        ServiceDetail::ModuleProgramming {
            module: "PCM".to_string(),
        },
        60,
    )
}

fn weekday_tech(id: &str, van: &str) -> Technician {
    WEEKDAYS.iter().fold(Technician::new(id, id).with_van(van), |tech, day| {
        tech.with_hours(DefaultHours::new(*day, t(9, 0), t(17, 0)))
    })
}

fn scan_van(id: &str) -> Van {
    Van::new(id).carrying(&format!("{}-scan", id), EquipmentType::new(ServiceCategory::DiagnosticScan))
}

fn requirement(service: ServiceCategory) -> EquipmentRequirement {
    EquipmentRequirement {
        service,
        vehicle: escape(),
        required: vec![EquipmentType::new(service)],
    }
}

/// Fleet of `techs` weekday technicians, each with a scan-tool van.
fn fleet(techs: &[&str]) -> Snapshot {
    let mut snapshot = Snapshot::new()
        .with_requirement(requirement(ServiceCategory::DiagnosticScan))
        .with_requirement(requirement(ServiceCategory::ModuleProgramming))
        .with_requirement(requirement(ServiceCategory::AirbagReset));
    for id in techs {
        let van = format!("van-{}", id);
        snapshot = snapshot
            .with_van(scan_van(&van))
            .with_technician(weekday_tech(id, &van));
    }
    snapshot
}

fn request(days: u32) -> OptimizeRequest {
    OptimizeRequest::new(Horizon::new(d(2025, 3, 3), days), at(0, 7, 0))
}

fn run(snapshot: &Snapshot, days: u32) -> PassResult {
    DispatchScheduler::new(DispatchConfig::default(), request(days))
        .schedule(snapshot)
        .unwrap()
}

fn assert_no_overlaps(result: &PassResult, technicians: &[&str]) {
    for tech in technicians {
        let mine = result.assignments_of(tech);
        for pair in mine.windows(2) {
            assert!(
                pair[0].end <= pair[1].start,
                "{} double-booked: {:?} and {:?}",
                tech,
                pair[0],
                pair[1]
            );
        }
    }
}

#[test]
fn test_two_jobs_one_technician_run_back_to_back() {
    let snapshot = fleet(&["t1"])
        .with_job(scan_job("j1", "1 Elm St", 60))
        .with_job(scan_job("j2", "1 Elm St", 60));

    let result = run(&snapshot, 5);

    assert_eq!(result.final_state, PassState::Committed);
    assert!(result.failures.is_empty());
    let j1 = result.assignment_for("j1").unwrap();
    let j2 = result.assignment_for("j2").unwrap();
    assert_eq!((j1.start, j1.end), (at(0, 9, 0), at(0, 10, 0)));
    assert_eq!((j2.start, j2.end), (at(0, 10, 0), at(0, 11, 0)));
    assert!(j2.batched);
    assert!(j2.end <= at(0, 17, 0));
}

#[test]
fn test_no_double_booking_and_every_job_accounted_for() {
    let techs = ["t1", "t2"];
    let mut snapshot = fleet(&techs);
    for i in 0..24 {
        let minutes = 45 + (i % 4) * 30;
        let street = format!("{} Main St", 100 + i % 6);
        snapshot = snapshot.with_job(
            scan_job(&format!("job-{:02}", i), &street, minutes).with_priority((i % 7) as i32),
        );
    }
    snapshot = snapshot.with_job(scan_job("pin", "9 Dock Rd", 120).with_fixed_time(at(1, 10, 0), Some("t1")));

    let result = run(&snapshot, 5);

    assert_eq!(result.len(), 25);
    assert_no_overlaps(&result, &techs);
    assert_eq!(result.metadata["jobs_considered"], "25");
}

#[test]
fn test_assignments_stay_inside_working_windows() {
    let techs = ["t1", "t2", "t3"];
    let mut snapshot = fleet(&techs);
    for i in 0..30 {
        snapshot = snapshot.with_job(scan_job(
            &format!("job-{:02}", i),
            &format!("{} Birch Ln", i),
            30 + (i % 5) * 45,
        ));
    }

    let result = run(&snapshot, 7);

    assert!(!result.assignments.is_empty());
    for a in &result.assignments {
        assert_eq!(a.start.date(), a.end.date());
        assert!(WEEKDAYS.contains(&a.start.weekday()), "{:?}", a);
        assert!(a.start.time() >= t(9, 0) && a.end.time() <= t(17, 0), "{:?}", a);
        assert_eq!(a.start.time().minute() % 15, 0);
    }
}

#[test]
fn test_fixed_job_never_moves() {
    let snapshot = fleet(&["t1"])
        .with_job(scan_job("fixed", "5 Ash Ct", 90).with_fixed_time(at(1, 13, 0), Some("t1")))
        .with_job(scan_job("late", "5 Ash Ct", 60).with_fixed_time(at(0, 18, 0), Some("t1")))
        .with_job(scan_job("busy-1", "7 Ash Ct", 240).with_priority(9))
        .with_job(scan_job("busy-2", "7 Ash Ct", 240).with_priority(9));

    let first = run(&snapshot, 5);
    let second = run(&snapshot, 5);

    for result in [&first, &second] {
        let fixed = result.assignment_for("fixed").unwrap();
        assert_eq!((fixed.technician_id.as_str(), fixed.start), ("t1", at(1, 13, 0)));
        assert!(fixed.fixed);
        let late = result.assignment_for("late").unwrap();
        assert_eq!(late.start, at(0, 18, 0));
        assert_no_overlaps(result, &["t1"]);
    }
}

#[test]
fn test_fixed_time_without_technician_picks_free_one() {
    let snapshot = fleet(&["t1", "t2"])
        .with_job(scan_job("pinned", "1 Elm St", 60).with_fixed_time(at(0, 14, 0), Some("t1")))
        .with_job(scan_job("floating", "2 Elm St", 60).with_fixed_time(at(0, 14, 0), None));

    let result = run(&snapshot, 5);

    let floating = result.assignment_for("floating").unwrap();
    assert_eq!(floating.technician_id, "t2");
    assert_eq!(floating.start, at(0, 14, 0));
    assert!(floating.fixed);
}

#[test]
fn test_fixed_collision_reported() {
    let snapshot = fleet(&["t1"])
        .with_job(scan_job("f1", "1 Elm St", 60).with_fixed_time(at(0, 10, 0), Some("t1")))
        .with_job(scan_job("f2", "2 Elm St", 60).with_fixed_time(at(0, 10, 30), Some("t1")));

    let result = run(&snapshot, 5);

    assert_eq!(result.assignment_for("f1").unwrap().start, at(0, 10, 0));
    assert_eq!(
        result.failure_for("f2").unwrap().reason,
        FailureReason::FixedTimeCollision
    );
    assert_eq!(
        result.warnings,
        vec![PassWarning::FixedTimeCollision {
            technician_id: "t1".to_string(),
            kept_job: "f1".to_string(),
            rejected_job: "f2".to_string(),
        }]
    );
}

#[test]
fn test_low_priority_job_is_eventually_placed() {
    // One hour of capacity per pass and a fresh urgent job every pass
    let mut snapshot = fleet(&[]).with_van(scan_van("v1")).with_technician(
        Technician::new("t1", "Solo")
            .with_van("v1")
            .with_hours(DefaultHours::new(Weekday::Mon, t(9, 0), t(10, 0))),
    );
    let mut pending: Vec<Job> = ["low-a", "low-b", "low-c"]
        .iter()
        .map(|id| scan_job(id, "3 Pine Rd", 60).with_priority(1))
        .collect();
    let mut ledger = AgingLedger::new();
    let mut placed_lows = 0;

    for pass in 0..20 {
        pending.push(scan_job(&format!("urgent-{}", pass), "8 Pine Rd", 60).with_priority(10));
        ledger.apply(&mut pending);
        snapshot.jobs = pending.clone();

        let result = run(&snapshot, 1);
        assert_eq!(result.assignments.len(), 1);
        ledger.record(&result);

        let placed = &result.assignments[0].job_id;
        if placed.starts_with("low-") {
            placed_lows += 1;
        }
        pending.retain(|job| &job.id != placed);
        if placed_lows == 3 {
            break;
        }
    }

    assert_eq!(placed_lows, 3);
}

#[test]
fn test_order_split_across_equipped_technicians() {
    let snapshot = Snapshot::new()
        .with_requirement(requirement(ServiceCategory::DiagnosticScan))
        .with_requirement(requirement(ServiceCategory::ModuleProgramming))
        .with_requirement(requirement(ServiceCategory::AirbagReset))
        .with_van(scan_van("scan-van"))
        .with_van(Van::new("module-van").carrying(
            "mp-1",
            EquipmentType::new(ServiceCategory::ModuleProgramming),
        ))
        .with_technician(weekday_tech("t-scan", "scan-van"))
        .with_technician(weekday_tech("t-module", "module-van"))
        .with_job(scan_job("o1-scan", "4 Cedar Way", 60).with_order("o1"))
        .with_job(module_job("o1-module", "4 Cedar Way").with_order("o1"))
        .with_job(
            Job::new(
                "o1-airbag",
                Address::new("4 Cedar Way"),
                escape(),
                ServiceDetail::AirbagReset {
                    modules_deployed: 2,
                },
                45,
            )
            .with_order("o1"),
        );

    let result = run(&snapshot, 5);

    assert_eq!(result.assignment_for("o1-scan").unwrap().technician_id, "t-scan");
    assert_eq!(
        result.assignment_for("o1-module").unwrap().technician_id,
        "t-module"
    );
    assert_eq!(
        result.failure_for("o1-airbag").unwrap().reason,
        FailureReason::InsufficientEquipmentCoverage
    );
}

#[test]
fn test_same_site_preferred_over_earlier_start() {
    let snapshot = fleet(&["t1", "t2"])
        .with_job(scan_job("oak-1", "12 Oak St", 60).with_priority(9))
        .with_job(scan_job("pine", "500 Pine Ave", 60).with_priority(5))
        .with_job(scan_job("oak-2", "12 Oak St", 60).with_priority(1));

    let result = run(&snapshot, 5);

    assert_eq!(result.assignment_for("oak-1").unwrap().technician_id, "t1");
    assert_eq!(result.assignment_for("pine").unwrap().technician_id, "t2");
    let oak_2 = result.assignment_for("oak-2").unwrap();
    assert_eq!(oak_2.technician_id, "t1");
    assert_eq!(oak_2.start, at(0, 10, 0));
    assert!(oak_2.batched);
}

#[test]
fn test_exceptions_and_weekends_honored() {
    let mut snapshot = fleet(&[]).with_van(scan_van("v1")).with_technician(
        weekday_tech("t1", "v1")
            .with_exception(AvailabilityException::unavailable(d(2025, 3, 3), "training"))
            .with_exception(AvailabilityException::hours(d(2025, 3, 4), t(13, 0), t(15, 0))),
    );
    snapshot = snapshot
        .with_job(scan_job("a-short", "1 Elm St", 60))
        .with_job(scan_job("b-long", "2 Elm St", 180));

    let result = run(&snapshot, 7);

    assert_eq!(result.assignment_for("a-short").unwrap().start, at(1, 13, 0));
    assert_eq!(result.assignment_for("b-long").unwrap().start, at(2, 9, 0));
}

#[test]
fn test_no_window_long_enough() {
    let snapshot = fleet(&["t1"]).with_job(scan_job("marathon", "1 Elm St", 9 * 60));

    let result = run(&snapshot, 5);

    assert_eq!(
        result.failure_for("marathon").unwrap().reason,
        FailureReason::NoCapacityInHorizon
    );
}

#[test]
fn test_unknown_requirement_does_not_block_others() {
    let tesla = Job::new(
        "tesla",
        Address::new("1 Elm St"),
        VehicleKey::new(2023, "Tesla", "Model 3"),
        ServiceDetail::DiagnosticScan,
        60,
    );
    let snapshot = fleet(&["t1"])
        .with_job(tesla)
        .with_job(scan_job("ford", "1 Elm St", 60));

    let result = run(&snapshot, 5);

    assert_eq!(
        result.failure_for("tesla").unwrap().reason,
        FailureReason::UnknownRequirement
    );
    assert!(result.assignment_for("ford").is_some());
}

#[test]
fn test_in_flight_work_consumes_capacity() {
    let snapshot = fleet(&["t1"])
        .with_job(
            scan_job("on-site", "1 Elm St", 120)
                .with_status(JobStatus::InProgress)
                .assigned_to("t1", at(0, 9, 0)),
        )
        .with_job(scan_job("driving", "2 Elm St", 60).with_status(JobStatus::EnRoute))
        .with_job(scan_job("next", "77 Far Rd", 60));

    let result = run(&snapshot, 5);

    assert_eq!(result.assignment_for("next").unwrap().start, at(0, 11, 0));
    assert!(result.assignment_for("on-site").is_none());
    assert!(result.failure_for("on-site").is_none());
    assert_eq!(
        result.warnings,
        vec![PassWarning::InFlightWithoutPlacement {
            job_id: "driving".to_string()
        }]
    );
}

#[test]
fn test_closed_jobs_are_ignored() {
    let snapshot = fleet(&["t1"])
        .with_job(scan_job("done", "1 Elm St", 60).with_status(JobStatus::Completed))
        .with_job(scan_job("open", "1 Elm St", 60));

    let result = run(&snapshot, 5);

    assert_eq!(result.len(), 1);
    assert_eq!(result.assignment_for("open").unwrap().start, at(0, 9, 0));
}

#[test]
fn test_invalid_snapshot_fails_pass() {
    let snapshot = fleet(&["t1"]).with_job(scan_job("broken", "1 Elm St", 0));
    let mut scheduler = DispatchScheduler::new(DispatchConfig::default(), request(5));

    let err = scheduler.schedule(&snapshot).unwrap_err();

    assert!(matches!(err, DispatchError::InvalidSnapshot(ref issues) if issues.len() == 1));
    assert_eq!(scheduler.state(), PassState::Failed);
}

struct Offline;

impl SnapshotSource for Offline {
    fn load(&self, horizon: &Horizon) -> Result<Snapshot, SnapshotError> {
        Err(SnapshotError::HorizonNotCovered(horizon.start))
    }
}

#[test]
fn test_load_failure_fails_pass() {
    let mut scheduler = DispatchScheduler::new(DispatchConfig::default(), request(5));

    let err = scheduler.run(&Offline).unwrap_err();

    assert!(matches!(
        err,
        DispatchError::SnapshotLoad(SnapshotError::HorizonNotCovered(_))
    ));
    assert_eq!(scheduler.state(), PassState::Failed);
}

#[test]
fn test_run_from_in_memory_source() {
    let snapshot = fleet(&["t1"]).with_job(scan_job("j1", "1 Elm St", 30));
    let mut scheduler = DispatchScheduler::new(DispatchConfig::default(), request(5));

    let result = scheduler.run(&snapshot).unwrap();

    assert_eq!(scheduler.state(), PassState::Committed);
    assert_eq!(result.assignment_for("j1").unwrap().duration_minutes(), 30);
}

#[test]
fn test_late_afternoon_window_too_short_on_grid() {
    // 16:01-17:00 is 59 minutes, but the first slot on the grid is 16:15
    let snapshot = fleet(&["t1"]).with_job(scan_job("late", "1 Elm St", 55));
    let request = OptimizeRequest::new(Horizon::new(d(2025, 3, 3), 1), at(0, 16, 1));

    let result = DispatchScheduler::new(DispatchConfig::default(), request)
        .schedule(&snapshot)
        .unwrap();

    assert_eq!(
        result.failure_for("late").unwrap().reason,
        FailureReason::NoCapacityInHorizon
    );

    let fits = fleet(&["t1"]).with_job(scan_job("short", "1 Elm St", 45));
    let result = DispatchScheduler::new(DispatchConfig::default(), request)
        .schedule(&fits)
        .unwrap();
    assert_eq!(result.assignment_for("short").unwrap().start, at(0, 16, 15));
}

#[test]
fn test_oversized_fixed_job_rejected_not_panicking() {
    let snapshot = fleet(&["t1"]).with_job(
        scan_job("forever", "1 Elm St", i64::MAX / 2).with_fixed_time(at(0, 10, 0), Some("t1")),
    );
    let mut scheduler = DispatchScheduler::new(DispatchConfig::default(), request(5));

    let err = scheduler.schedule(&snapshot).unwrap_err();

    assert!(matches!(err, DispatchError::InvalidSnapshot(ref issues) if issues[0].entity == "job forever"));
    assert_eq!(scheduler.state(), PassState::Failed);
}

#[test]
fn test_scheduler_reusable_after_pass() {
    let snapshot = fleet(&["t1"]).with_job(scan_job("j1", "1 Elm St", 60));
    let mut scheduler = DispatchScheduler::new(DispatchConfig::default(), request(5));

    let first = scheduler.schedule(&snapshot).unwrap();
    let second = scheduler.schedule(&snapshot).unwrap();

    assert_eq!(scheduler.state(), PassState::Committed);
    assert_eq!(first.assignments, second.assignments);

    // A failed pass does not poison the next one
    let broken = fleet(&["t1"]).with_job(scan_job("bad", "1 Elm St", 0));
    assert!(scheduler.schedule(&broken).is_err());
    assert_eq!(scheduler.state(), PassState::Failed);
    assert!(scheduler.run(&snapshot).is_ok());
    assert_eq!(scheduler.state(), PassState::Committed);
}

#[test]
fn test_fixed_job_over_in_flight_work_is_collision() {
    let snapshot = fleet(&["t1"])
        .with_job(
            scan_job("on-site", "1 Elm St", 120)
                .with_status(JobStatus::InProgress)
                .assigned_to("t1", at(0, 9, 0)),
        )
        .with_job(scan_job("pinned", "2 Elm St", 60).with_fixed_time(at(0, 10, 0), Some("t1")));

    let result = run(&snapshot, 5);

    let failure = result.failure_for("pinned").unwrap();
    assert_eq!(failure.reason, FailureReason::FixedTimeCollision);
    assert!(failure.detail.contains("in-flight job on-site"));
}

