//! One citizen update.
//!
//! [`step_citizen`] runs on worker threads and touches nothing but the
//! citizen it is given. Anything that needs shared mutable state (issuing
//! or releasing a path, pairing for an interaction) is returned in the
//! [`StepOutcome`] for the engine thread to carry out after the batch.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use civsim_logic::activities::choose_activity;
use civsim_logic::demographics::{age_years, occupation_after_band_change};
use civsim_logic::effects::{
    apply_activity_progress, apply_state_effects, entry_destination, ActivityProgress,
    Destination,
};
use civsim_logic::needs::{decay_needs, NeedKind};
use civsim_logic::schedule::{template_for, AgeBand, DailySchedule};
use civsim_logic::state::BehaviorState;
use civsim_logic::time::{day_of_week, is_weekend, minute_of_day, DayMinute};
use civsim_logic::transitions::{decide_transition, Transition, TransitionInput, TransitionReason};
use civsim_logic::vitals::drift_vitals;

use crate::citizen::{Citizen, CitizenId, Location, StatusFlags};
use crate::collaborators::{AgentClass, PathHandle, PathPriority, PathStatus, PathfindingService};
use crate::config::EngineConfig;
use crate::error::CitizenFault;

/// Shared, read-only inputs for every step in a batch.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub now: f64,
    pub minute: DayMinute,
    pub weekend: bool,
    pub tick: u64,
    pub config: &'a EngineConfig,
    pub pathfinder: &'a dyn PathfindingService,
    pub happiness_baseline: f32,
}

impl<'a> StepContext<'a> {
    pub fn new(
        now: f64,
        tick: u64,
        config: &'a EngineConfig,
        pathfinder: &'a dyn PathfindingService,
        happiness_baseline: f32,
    ) -> Self {
        Self {
            now,
            minute: minute_of_day(now),
            weekend: is_weekend(day_of_week(now)),
            tick,
            config,
            pathfinder,
            happiness_baseline,
        }
    }
}

/// A path the engine should request on the citizen's behalf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathRequest {
    pub from: Location,
    pub to: Location,
    pub class: AgentClass,
    pub priority: PathPriority,
}

/// What a step leaves for the engine thread.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepOutcome {
    pub transition: Option<Transition>,
    pub path_request: Option<PathRequest>,
    pub path_release: Option<PathHandle>,
    pub band_change: Option<(AgeBand, AgeBand)>,
    pub relationships_released: u8,
    /// Looking for company; a candidate for this tick's pairing pass.
    pub social_candidate: bool,
}

impl StepOutcome {
    /// Whether the engine has anything to do for this citizen.
    pub fn needs_follow_up(&self) -> bool {
        self.path_request.is_some() || self.path_release.is_some() || self.social_candidate
    }
}

fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Random stream for one citizen on one tick.
///
/// Depends only on the root seed, the citizen and the tick, so results do
/// not depend on which worker ran the step.
pub(crate) fn citizen_rng(seed: u64, id: CitizenId, tick: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(mix(mix(seed ^ id.raw()) ^ tick))
}

/// Advance one citizen from its last update to `ctx.now`.
pub fn step_citizen(c: &mut Citizen, ctx: &StepContext<'_>) -> Result<StepOutcome, CitizenFault> {
    c.validate()?;

    let cfg = ctx.config;
    let now = ctx.now;
    let elapsed = now - c.last_update;
    let mut out = StepOutcome::default();

    decay_needs(&mut c.needs, c.state, &c.personality, elapsed, &cfg.needs);
    let progress = ActivityProgress {
        activity: c.activity,
        started_at: c.activity_started_at,
        duration_minutes: c.activity_duration,
    };
    let activity_done =
        apply_activity_progress(&progress, c.last_update, now, &mut c.needs, &mut c.vitals);
    apply_state_effects(
        c.state,
        c.emergency_reason,
        &mut c.needs,
        &mut c.vitals,
        &c.personality,
        elapsed,
    );
    drift_vitals(
        &mut c.vitals,
        &c.needs,
        &c.personality,
        ctx.happiness_baseline,
        cfg.thresholds.critical,
        elapsed,
    );

    let arrived = poll_travel(c, ctx.pathfinder, &mut out);

    let free_day = ctx.weekend || !c.occupation.has_fixed_hours();
    let input = TransitionInput {
        current: c.state,
        minutes_in_state: c.minutes_in_state(now),
        minute: ctx.minute,
        free_day,
        schedule: &c.schedule,
        commute_minutes: c.commute_minutes,
        needs: &c.needs,
        personality: &c.personality,
        emergency_reason: c.emergency_reason,
        arrived,
        thresholds: &cfg.thresholds,
    };
    if let Some(t) = decide_transition(&input) {
        let mut rng = citizen_rng(cfg.seed, c.id, ctx.tick);
        leave_state(c, &mut out);
        enter_state(c, t, ctx, &mut rng, &mut out);
        out.transition = Some(t);
    } else if activity_done {
        let mut rng = citizen_rng(cfg.seed, c.id, ctx.tick);
        start_activity(c, ctx, &mut rng);
    }

    out.relationships_released = c.relationships.decay(now, &cfg.relationship_decay).released;
    out.band_change = grow_older(c, ctx);

    out.social_candidate = c.interaction.is_none()
        && c.state.allows_interaction()
        && (c.state == BehaviorState::Socializing
            || c.activity.template().involves_other
            || c.needs.get(NeedKind::Social) < cfg.thresholds.seek_level(&c.personality));

    c.last_update = now;
    Ok(out)
}

/// Poll the trip in progress. Returns whether a commute has arrived.
///
/// A failed or forgotten route falls back to moving the citizen straight
/// to its destination.
fn poll_travel(c: &mut Citizen, pathfinder: &dyn PathfindingService, out: &mut StepOutcome) -> bool {
    if !c.state.is_commute() {
        return false;
    }
    if let Some(handle) = c.path {
        match pathfinder.status(handle) {
            PathStatus::Pending => return false,
            PathStatus::Ready | PathStatus::Failed => out.path_release = Some(handle),
            PathStatus::Unknown => {}
        }
        c.path = None;
    }
    c.flags.remove(StatusFlags::AWAITING_PATH);
    if let Some(dest) = c.destination.take() {
        c.position = dest;
    }
    if c.work.is_some_and(|w| w == c.position) {
        c.flags.insert(StatusFlags::AT_WORK);
    } else {
        c.flags.remove(StatusFlags::AT_WORK);
    }
    true
}

fn leave_state(c: &mut Citizen, out: &mut StepOutcome) {
    if let Some(handle) = c.path.take() {
        out.path_release = Some(handle);
    }
    c.flags.remove(StatusFlags::AWAITING_PATH);
    c.destination = None;
}

fn enter_state(
    c: &mut Citizen,
    t: Transition,
    ctx: &StepContext<'_>,
    rng: &mut ChaCha8Rng,
    out: &mut StepOutcome,
) {
    c.state = t.to;
    c.state_entered_at = ctx.now;
    c.emergency_reason = match (t.to, t.reason) {
        (BehaviorState::Emergency, TransitionReason::Critical(kind)) => Some(kind),
        _ => None,
    };
    start_activity(c, ctx, rng);

    let target = match entry_destination(t.to) {
        Some(Destination::Work) => c.work,
        Some(Destination::Home) => Some(c.home),
        None => None,
    };
    if let Some(to) = target.filter(|to| *to != c.position) {
        c.destination = Some(to);
        c.flags.insert(StatusFlags::AWAITING_PATH);
        out.path_request = Some(PathRequest {
            from: c.position,
            to,
            class: AgentClass::Commuter,
            priority: PathPriority::Normal,
        });
    }
}

fn start_activity(c: &mut Citizen, ctx: &StepContext<'_>, rng: &mut ChaCha8Rng) {
    let choice = choose_activity(
        c.state,
        c.occupation,
        &c.needs,
        &c.personality,
        c.vitals.energy,
        ctx.minute,
        c.venue(),
        rng,
    );
    c.activity = choice.id;
    c.activity_started_at = ctx.now;
    c.activity_duration = choice.duration_minutes;
}

/// Update age from the birth time; re-plan life on an age-band change.
fn grow_older(c: &mut Citizen, ctx: &StepContext<'_>) -> Option<(AgeBand, AgeBand)> {
    let age = age_years(c.birth_time, ctx.now, ctx.config.minutes_per_year);
    if age == c.age {
        return None;
    }
    let from = c.age_band();
    c.age = age;
    let to = c.age_band();
    if from == to {
        return None;
    }
    c.occupation = occupation_after_band_change(from, to, c.occupation);
    // distinct stream from the transition draw on the same tick
    let mut rng = citizen_rng(ctx.config.seed ^ 0xA6E, c.id, ctx.tick);
    c.schedule = DailySchedule::seeded(
        &template_for(to, c.occupation),
        c.personality.routine_flexibility(),
        &mut rng,
    );
    Some((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::DirectRoutePathfinder;
    use civsim_logic::activities::ActivityId;
    use civsim_logic::schedule::Occupation;
    use civsim_logic::time::hm;

    fn citizen(age: u8, occupation: Occupation) -> Citizen {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut c = Citizen::new(
            CitizenId::new(0, 0),
            Location::new(0.0, 0.0),
            age,
            occupation,
            0.0,
            525_600.0,
            &mut rng,
        );
        c.schedule = DailySchedule::from_template(&template_for(c.age_band(), occupation));
        c
    }

    /// Put `c` in `state` since `since` minutes before `now`, updated at `now`.
    fn settle(c: &mut Citizen, state: BehaviorState, now: f64, since: f64) {
        c.state = state;
        c.state_entered_at = now - since;
        c.activity_started_at = now - since;
        c.last_update = now;
    }

    #[test]
    fn test_hunger_wins_tie_with_sleep() {
        let config = EngineConfig::default();
        let pf = DirectRoutePathfinder::new();
        let now = hm(10, 0) as f64;
        let mut c = citizen(30, Occupation::Office);
        settle(&mut c, BehaviorState::Working, now, 60.0);
        c.needs.set(NeedKind::Hunger, 5.0);
        c.needs.set(NeedKind::Sleep, 5.0);

        let out = step_citizen(&mut c, &StepContext::new(now, 1, &config, &pf, 60.0)).unwrap();
        assert_eq!(c.state, BehaviorState::Emergency);
        assert_eq!(c.emergency_reason, Some(NeedKind::Hunger));
        assert_eq!(
            out.transition.map(|t| t.reason),
            Some(TransitionReason::Critical(NeedKind::Hunger))
        );
    }

    #[test]
    fn test_zero_elapsed_leaves_needs_alone() {
        let config = EngineConfig::default();
        let pf = DirectRoutePathfinder::new();
        let now = hm(3, 0) as f64;
        let mut c = citizen(30, Occupation::Office);
        settle(&mut c, BehaviorState::Sleeping, now, 240.0);
        let before = c.needs;

        step_citizen(&mut c, &StepContext::new(now, 1, &config, &pf, 60.0)).unwrap();
        assert_eq!(c.needs, before);
        assert_eq!(c.state, BehaviorState::Sleeping);
    }

    #[test]
    fn test_needs_decay_over_elapsed_time() {
        let config = EngineConfig::default();
        let pf = DirectRoutePathfinder::new();
        let now = hm(14, 0) as f64;
        let mut c = citizen(30, Occupation::Office);
        settle(&mut c, BehaviorState::Working, now, 120.0);
        c.last_update = now - 60.0;
        let hunger = c.needs.get(NeedKind::Hunger);

        step_citizen(&mut c, &StepContext::new(now, 1, &config, &pf, 60.0)).unwrap();
        assert!(c.needs.get(NeedKind::Hunger) < hunger);
        assert_eq!(c.last_update, now);
    }

    #[test]
    fn test_non_finite_need_is_reported() {
        let config = EngineConfig::default();
        let pf = DirectRoutePathfinder::new();
        let mut c = citizen(30, Occupation::Office);
        c.vitals.stress = f32::INFINITY;
        let err = step_citizen(&mut c, &StepContext::new(10.0, 1, &config, &pf, 60.0)).unwrap_err();
        assert_eq!(err, CitizenFault::NonFinite { field: "vitals" });
    }

    #[test]
    fn test_commute_requests_path() {
        let config = EngineConfig::default();
        let pf = DirectRoutePathfinder::new();
        let now = hm(8, 35) as f64;
        let mut c = citizen(30, Occupation::Office);
        c.work = Some(Location::new(100.0, 0.0));
        c.refresh_commute();
        settle(&mut c, BehaviorState::MorningRoutine, now, 90.0);

        let out = step_citizen(&mut c, &StepContext::new(now, 1, &config, &pf, 60.0)).unwrap();
        assert_eq!(c.state, BehaviorState::CommutingToWork);
        let req = out.path_request.unwrap();
        assert_eq!(req.to, Location::new(100.0, 0.0));
        assert!(c.flags.contains(StatusFlags::AWAITING_PATH));
        assert_eq!(c.destination, c.work);
    }

    #[test]
    fn test_arrival_releases_path() {
        let config = EngineConfig::default();
        let mut pf = DirectRoutePathfinder::new();
        let now = hm(8, 40) as f64;
        let work = Location::new(40.0, 0.0);
        let mut c = citizen(30, Occupation::Office);
        c.work = Some(work);
        c.refresh_commute();
        settle(&mut c, BehaviorState::CommutingToWork, now, 20.0);
        c.destination = Some(work);
        let handle =
            pf.request_path(c.position, work, AgentClass::Commuter, PathPriority::Normal);
        c.path = Some(handle);

        let out = step_citizen(&mut c, &StepContext::new(now, 1, &config, &pf, 60.0)).unwrap();
        assert_eq!(c.position, work);
        assert_eq!(out.path_release, Some(handle));
        assert_eq!(c.state, BehaviorState::Working);
        assert!(c.flags.contains(StatusFlags::AT_WORK));
        assert!(c.path.is_none());
    }

    #[test]
    fn test_leaving_mid_commute_releases_path() {
        let config = EngineConfig::default();
        let mut pf = DirectRoutePathfinder::new();
        let now = hm(8, 40) as f64;
        let mut c = citizen(30, Occupation::Office);
        settle(&mut c, BehaviorState::CommutingToWork, now, 10.0);
        let handle = pf.request_path(
            c.position,
            Location::new(9.0, 9.0),
            AgentClass::Commuter,
            PathPriority::Normal,
        );
        pf.release(handle);
        c.path = Some(handle);
        c.needs.set(NeedKind::Thirst, 1.0);

        let out = step_citizen(&mut c, &StepContext::new(now, 1, &config, &pf, 60.0)).unwrap();
        assert_eq!(c.state, BehaviorState::Emergency);
        assert!(c.path.is_none());
        // unknown handle: nothing left to release
        assert_eq!(out.path_release, None);
    }

    #[test]
    fn test_coming_of_age_changes_plans() {
        let config = EngineConfig::default();
        let pf = DirectRoutePathfinder::new();
        let mut c = citizen(17, Occupation::Student);
        let now = c.birth_time + 18.0 * config.minutes_per_year + 1.0;
        c.last_update = now;
        c.state_entered_at = now;

        let out = step_citizen(&mut c, &StepContext::new(now, 1, &config, &pf, 60.0)).unwrap();
        assert_eq!(c.age, 18);
        assert_eq!(out.band_change, Some((AgeBand::Child, AgeBand::Adult)));
        assert_eq!(c.occupation, Occupation::Unemployed);
        assert!(!c.schedule.has_work());
    }

    #[test]
    fn test_socializing_citizen_is_candidate() {
        let config = EngineConfig::default();
        let pf = DirectRoutePathfinder::new();
        let now = hm(19, 0) as f64;
        let mut c = citizen(30, Occupation::Office);
        settle(&mut c, BehaviorState::Socializing, now, 5.0);
        c.needs.set(NeedKind::Social, 20.0);

        let out = step_citizen(&mut c, &StepContext::new(now, 1, &config, &pf, 60.0)).unwrap();
        assert_eq!(c.state, BehaviorState::Socializing);
        assert!(out.social_candidate);
    }

    #[test]
    fn test_social_activity_makes_candidate() {
        let config = EngineConfig::default();
        let pf = DirectRoutePathfinder::new();
        let now = hm(19, 0) as f64;
        let mut c = citizen(30, Occupation::Office);
        settle(&mut c, BehaviorState::EveningActivities, now, 5.0);
        c.needs.set(NeedKind::Social, 100.0);
        c.activity_duration = 600.0;

        c.activity = ActivityId::Reading;
        let step = |c: &mut Citizen| {
            step_citizen(c, &StepContext::new(now, 1, &config, &pf, 60.0)).unwrap()
        };
        assert!(!step(&mut c).social_candidate);

        c.activity = ActivityId::DineOut;
        let out = step(&mut c);
        assert_eq!(c.state, BehaviorState::EveningActivities);
        assert!(out.social_candidate);
    }

    #[test]
    fn test_rng_streams_are_stable() {
        use rand::Rng;
        let id = CitizenId::new(4, 2);
        let a: u64 = citizen_rng(7, id, 3).gen();
        let b: u64 = citizen_rng(7, id, 3).gen();
        let c: u64 = citizen_rng(7, id, 4).gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
