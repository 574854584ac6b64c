//! End-to-end runs through the kernel handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rotor_core::{
    state_hash, BundleId, EventKind, EventPayload, Hook, Pool, SimState, SimTime, SpellId, SpellInfo,
    StatBlock, StaticMetadata, Unit, UnitId,
};
use rotor_engine::{
    priority, register_kernel_handlers, rotation_fn, AutoAction, BundleRegistry, CastOutcome,
    HandlerFailure, HandlerOptions, PeriodicConfig, ProfileBundle, ProfileComposer, Rotation,
    Services, SimConfig, SimDriver, SimError, Simulation, SpellOverride,
};
use rotor_test_utils::fixtures::{FailingModifier, RecordingModifier};
use rotor_test_utils::{duel, dummy, ids, shared_spellbook};

fn quiet_config() -> SimConfig {
    SimConfig {
        periodic: PeriodicConfig {
            power_interval: None,
            ..PeriodicConfig::default()
        },
        ..SimConfig::default()
    }
}

fn burst_or_filler() -> Arc<dyn Rotation> {
    Arc::new(rotation_fn(|api| {
        let me = api.player();
        if api.can_cast(&me, ids::BURST) {
            api.cast(&me, ids::BURST, None)?;
        } else {
            api.cast(&me, ids::FILLER, None)?;
        }
        Ok(())
    }))
}

/// Record `(time, spell)` for every cast start.
fn record_casts(sim: &mut Simulation) -> Arc<Mutex<Vec<(u64, SpellId)>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let _ = sim.registry_mut().on(
        EventKind::SpellCastStart,
        move |ev, _ctx| {
            if let Some(spell) = ev.spell_id() {
                sink.lock().unwrap().push((ev.time.0, spell));
            }
            Ok(())
        },
        HandlerOptions::new().id("test.record_casts").priority(priority::TELEMETRY),
    );
    log
}

#[test]
fn cooldown_spell_interleaves_with_filler() {
    let state = duel(&[ids::BURST, ids::FILLER]);
    let mut sim = Simulation::new(state, shared_spellbook(), quiet_config()).unwrap();
    let casts = record_casts(&mut sim);

    let result = sim.run(burst_or_filler(), SimTime(9000)).unwrap();

    let (a, b) = (ids::BURST, ids::FILLER);
    assert_eq!(
        *casts.lock().unwrap(),
        vec![
            (0, a),
            (1500, b),
            (3000, b),
            (4500, b),
            (6000, a),
            (7500, b),
            (9000, b),
        ]
    );
    let player = &result.final_state.units[&UnitId::new("p")];
    assert_eq!(player.damage_done, 2 * 100 + 5 * 40);
    assert_eq!(result.metrics.casts, 7);
    assert!(result.final_state.current_time <= SimTime(9000));
    assert!(!result.metrics.iteration_cap_hit);
}

#[test]
fn snapshot_channel_skips_no_op_events() {
    let state = duel(&[ids::BURST, ids::FILLER]);
    let mut sim = Simulation::new(state, shared_spellbook(), quiet_config()).unwrap();
    let rx = sim.subscribe();

    let result = sim.run(burst_or_filler(), SimTime(9000)).unwrap();
    let published: Vec<_> = rx.try_iter().collect();

    assert_eq!(published.len() as u64, result.metrics.snapshots_published);
    assert_eq!(published[0].current_time, SimTime::ZERO);
    // cast-start and cooldown-ready events change nothing
    assert!(result.metrics.snapshots_published < result.events_processed);
    for pair in published.windows(2) {
        assert_ne!(*pair[0], *pair[1]);
    }
}

#[test]
fn power_regenerates_on_fixed_interval() {
    let mut p = rotor_test_utils::player("p", &[]);
    p.power = Pool { current: 0, max: 100 };
    let state = SimState::with_units([p, dummy()]);
    let config = SimConfig::default();
    let mut sim = Simulation::new(state, shared_spellbook(), config).unwrap();

    let idle = Arc::new(rotation_fn(|api| api.wait(SimTime(10_000))));
    let result = sim.run(idle, SimTime(5000)).unwrap();

    assert_eq!(result.final_state.units[&UnitId::new("p")].power.current, 20);
}

#[test]
fn auto_action_uses_the_cast_path() {
    let state = duel(&[ids::FILLER]);
    let config = SimConfig {
        periodic: PeriodicConfig {
            power_interval: None,
            power_amount: 0,
            auto_action: Some(AutoAction {
                spell: ids::FILLER,
                interval: SimTime(2500),
            }),
        },
        ..SimConfig::default()
    };
    let mut sim = Simulation::new(state, shared_spellbook(), config).unwrap();
    let casts = record_casts(&mut sim);

    let idle = Arc::new(rotation_fn(|api| api.wait(SimTime(10_000))));
    let result = sim.run(idle, SimTime(5000)).unwrap();

    assert_eq!(
        *casts.lock().unwrap(),
        vec![(2500, ids::FILLER), (5000, ids::FILLER)]
    );
    assert_eq!(result.final_state.units[&UnitId::new("p")].damage_done, 80);
}

#[test]
fn projectile_lands_exactly_once() {
    let state = duel(&[ids::ARROW]);
    let mut sim = Simulation::new(state, shared_spellbook(), quiet_config()).unwrap();

    // Replay the impact event once more after it has resolved.
    let replayed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&replayed);
    let _ = sim.registry_mut().on(
        EventKind::ProjectileImpact,
        move |ev, ctx| {
            if !flag.swap(true, Ordering::SeqCst) {
                ctx.emitter
                    .emit_in(SimTime(100), EventKind::ProjectileImpact, ev.payload.clone());
            }
            Ok(())
        },
        HandlerOptions::new().priority(priority::REACTIVE),
    );

    let rotation = Arc::new(rotation_fn(|api| {
        if api.now().is_zero() {
            let me = api.player();
            api.cast(&me, ids::ARROW, None)?;
            return Ok(());
        }
        api.wait(SimTime(10_000))
    }));
    let result = sim.run(rotation, SimTime(3000)).unwrap();

    assert!(replayed.load(Ordering::SeqCst));
    assert!(result.final_state.projectiles.is_empty());
    assert_eq!(result.final_state.units[&UnitId::new("p")].damage_done, 60);
    assert_eq!(
        result.final_state.units[&UnitId::new("dummy")].health.current,
        1_000_000 - 60
    );
    assert_eq!(result.metrics.projectiles_launched, 1);
    assert_eq!(result.metrics.projectiles_resolved, 1);
}

#[test]
fn projectile_in_flight_at_horizon_stays_unresolved() {
    let state = duel(&[ids::ARROW]);
    let mut sim = Simulation::new(state, shared_spellbook(), quiet_config()).unwrap();
    let rotation = Arc::new(rotation_fn(|api| {
        let me = api.player();
        api.cast(&me, ids::ARROW, None)?;
        Ok(())
    }));
    // Casts at 0 and 1500; the second arrow would land at 2300.
    let result = sim.run(rotation, SimTime(2000)).unwrap();
    assert_eq!(result.final_state.projectiles.len(), 1);
    assert_eq!(result.final_state.units[&UnitId::new("p")].damage_done, 60);
}

#[test]
fn aura_stacks_refresh_and_expire() {
    let empower_twice = || -> Arc<dyn Rotation> {
        Arc::new(rotation_fn(|api| {
            if api.now() < SimTime(3000) {
                let me = api.player();
                api.cast(&me, ids::EMPOWER, None)?;
                return Ok(());
            }
            api.wait(SimTime(100_000))
        }))
    };

    let mut sim =
        Simulation::new(duel(&[ids::EMPOWER]), shared_spellbook(), quiet_config()).unwrap();
    let result = sim.run(empower_twice(), SimTime(5000)).unwrap();
    let aura = &result.final_state.units[&UnitId::new("p")].auras[&ids::FOCUS];
    assert_eq!(aura.stacks, 2);
    assert_eq!(aura.expires_at, SimTime(5500));

    let mut sim =
        Simulation::new(duel(&[ids::EMPOWER]), shared_spellbook(), quiet_config()).unwrap();
    let result = sim.run(empower_twice(), SimTime(6000)).unwrap();
    assert!(result.final_state.units[&UnitId::new("p")].auras.is_empty());
}

#[test]
fn charges_recover_one_at_a_time() {
    let mut sim = Simulation::new(duel(&[ids::DASH]), shared_spellbook(), quiet_config()).unwrap();
    let casts = record_casts(&mut sim);
    let rotation = Arc::new(rotation_fn(|api| {
        let me = api.player();
        if api.can_cast(&me, ids::DASH) {
            api.cast(&me, ids::DASH, None)?;
            return Ok(());
        }
        api.wait(SimTime(1000))
    }));

    sim.run(rotation, SimTime(6000)).unwrap();
    let times: Vec<u64> = casts.lock().unwrap().iter().map(|(t, _)| *t).collect();
    assert_eq!(times, vec![0, 0, 5000]);
}

#[test]
fn profile_granted_charge_recovers() {
    let bundle = ProfileBundle::new("double-burst").with_override(
        ids::BURST,
        SpellOverride {
            cooldown: Some(SimTime::ZERO),
            charges: Some((2, SimTime(2000))),
            ..SpellOverride::default()
        },
    );
    let composer = ProfileComposer::new(BundleRegistry::new().with(bundle));
    let profile = composer.compose(&[BundleId::new("double-burst")]).unwrap();
    let mut state = duel(&[ids::BURST]);
    let metadata = shared_spellbook();
    profile
        .apply_to(state.units.get_mut(&UnitId::new("p")).unwrap(), metadata.as_ref())
        .unwrap();

    let mut sim = Simulation::new(state, metadata, quiet_config()).unwrap();
    let casts = record_casts(&mut sim);
    let rotation = Arc::new(rotation_fn(|api| {
        let me = api.player();
        if api.can_cast(&me, ids::BURST) {
            api.cast(&me, ids::BURST, None)?;
            return Ok(());
        }
        api.wait(SimTime(500))
    }));

    sim.run(rotation, SimTime(10_000)).unwrap();
    let times: Vec<u64> = casts.lock().unwrap().iter().map(|(t, _)| *t).collect();
    assert!(times.len() > 2, "casts: {times:?}");
    assert_eq!(&times[..3], &[0, 1500, 3000]);
}

#[test]
fn power_ratings_do_not_scale_damage() {
    let mut state = duel(&[ids::FILLER]);
    state.units.get_mut(&UnitId::new("p")).unwrap().stats = StatBlock {
        attack_power: 500,
        spell_power: 500,
        ..StatBlock::default()
    };
    let mut sim = Simulation::new(state, shared_spellbook(), quiet_config()).unwrap();
    let rotation = Arc::new(rotation_fn(|api| {
        let me = api.player();
        api.cast(&me, ids::FILLER, None)?;
        Ok(())
    }));
    // Filler at 0 and 1500.
    let result = sim.run(rotation, SimTime(2000)).unwrap();
    assert_eq!(result.final_state.units[&UnitId::new("p")].damage_done, 2 * 40);
}

#[test]
fn cast_time_spell_completes_later() {
    let mut sim = Simulation::new(duel(&[ids::NUKE]), shared_spellbook(), quiet_config()).unwrap();
    let rotation = Arc::new(rotation_fn(|api| {
        let me = api.player();
        if api.can_cast(&me, ids::NUKE) {
            api.cast(&me, ids::NUKE, None)?;
        }
        Ok(())
    }));
    // Casts start at 0, 2000, 4000; the last one completes at 6000.
    let result = sim.run(rotation, SimTime(5000)).unwrap();
    let p = &result.final_state.units[&UnitId::new("p")];
    assert_eq!(p.damage_done, 2 * 150);
    assert!(p.is_casting());
}

#[test]
fn runaway_rotation_hits_iteration_cap() {
    let config = SimConfig {
        max_iterations: 50,
        ..quiet_config()
    };
    let mut sim = Simulation::new(duel(&[]), shared_spellbook(), config).unwrap();
    let spin = Arc::new(rotation_fn(|api| api.wait(SimTime::ZERO)));

    let result = sim.run(spin, SimTime(1000)).unwrap();
    assert!(result.metrics.iteration_cap_hit);
    assert_eq!(result.events_processed, 50);
    assert_eq!(result.final_state.iteration_count, 50);
    assert_eq!(result.final_state.current_time, SimTime::ZERO);
}

#[test]
fn handler_failure_aborts_the_run() {
    let mut sim = Simulation::new(duel(&[ids::FILLER]), shared_spellbook(), quiet_config()).unwrap();
    let _ = sim.registry_mut().on(
        EventKind::SpellDamage,
        |_, _| Err(HandlerFailure::custom("combat log corrupted")),
        HandlerOptions::new().id("test.explode"),
    );

    let err = sim.run(burst_or_filler(), SimTime(9000)).unwrap_err();
    match err {
        SimError::Handler(e) => {
            assert_eq!(e.handler_id, "test.explode");
            assert_eq!(e.event_tag, "spell_damage@0ms");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn modifier_hook_failures_are_logged_not_fatal() {
    let recorder = RecordingModifier::new("recorder");
    let spell = SpellInfo::new(SpellId(50), "Cursed Bolt")
        .with_damage(10)
        .with_modifier(FailingModifier::on(Hook::OnHit))
        .with_modifier(recorder.clone());
    let metadata = Arc::new(StaticMetadata::new().with_spell(spell.clone()));
    let player = Unit::builder("p", "P").player().spell(Arc::new(spell)).build();
    let state = SimState::with_units([player, dummy()]);

    let mut sim = Simulation::new(state, metadata, quiet_config()).unwrap();
    let rotation = Arc::new(rotation_fn(|api| {
        let me = api.player();
        api.cast(&me, SpellId(50), None)?;
        Ok(())
    }));
    let result = sim.run(rotation, SimTime(3000)).unwrap();

    // casts at 0, 1500, 3000
    assert_eq!(result.metrics.hook_failures, 3);
    assert_eq!(recorder.calls(Hook::BeforeCast), 3);
    assert_eq!(recorder.calls(Hook::OnCast), 3);
    assert_eq!(recorder.calls(Hook::OnHit), 3);
    assert_eq!(recorder.calls(Hook::OnDamage), 3);
    assert_eq!(recorder.damage_seen(), 30);
    assert_eq!(result.final_state.units[&UnitId::new("p")].damage_done, 30);
}

#[test]
fn before_cast_failure_is_a_rotation_error() {
    let spell = SpellInfo::new(SpellId(51), "Jammed").with_modifier(FailingModifier::on(Hook::BeforeCast));
    let player = Unit::builder("p", "P").player().spell(Arc::new(spell)).build();
    let mut sim = Simulation::new(
        SimState::with_units([player, dummy()]),
        Arc::new(StaticMetadata::new()),
        quiet_config(),
    )
    .unwrap();
    let rotation = Arc::new(rotation_fn(|api| {
        let me = api.player();
        api.cast(&me, SpellId(51), None)?;
        Ok(())
    }));
    match sim.run(rotation, SimTime(1000)).unwrap_err() {
        SimError::Handler(e) => assert_eq!(e.handler_id, "kernel.apl_evaluate"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn successful_cast_marks_evaluation_interrupted() {
    let mut services = Services::new(shared_spellbook(), quiet_config());
    services.rotation = Some(burst_or_filler());
    services.player = Some(UnitId::new("p"));
    let mut driver = SimDriver::new(duel(&[ids::BURST, ids::FILLER]), services);
    register_kernel_handlers(driver.registry_mut());
    driver
        .scheduler_mut()
        .schedule(SimTime::ZERO, EventKind::AplEvaluate, EventPayload::None)
        .unwrap();

    let processed = driver.step().unwrap().unwrap();
    assert_eq!(processed.event.kind, EventKind::AplEvaluate);
    assert_eq!(processed.outcome, CastOutcome::Interrupted);
    assert!(processed.state_changed);
}

#[test]
fn identical_seeds_give_identical_runs() {
    let run = |seed: u64| {
        let mut p = rotor_test_utils::player("p", &[ids::BURST, ids::FILLER]);
        p.stats = StatBlock {
            crit_chance: 0.4,
            ..StatBlock::default()
        };
        let state = SimState::with_units([p, dummy()]);
        let mut sim =
            Simulation::new(state, shared_spellbook(), quiet_config().with_seed(seed)).unwrap();
        let result = sim.run(burst_or_filler(), SimTime(60_000)).unwrap();
        state_hash(&result.final_state)
    };
    assert_eq!(run(7), run(7));
    assert_eq!(run(99), run(99));
}
