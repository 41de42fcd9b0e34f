//! Event dispatch through features and systems.

use std::sync::Arc;

use parking_lot::Mutex;
use sparse_ecs::{
    After, Before, Error, Feature, Registry, RegistryConfig, Result, System, exists,
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity {
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, Copy)]
struct Anchored;

#[derive(Debug, Clone, Copy)]
struct Update {
    dt: i32,
}

#[derive(Debug, Clone, Copy)]
struct Tick;

#[derive(Debug, Clone, Copy)]
struct Outer;

#[derive(Debug, Clone, Copy)]
struct Inner;

#[derive(Debug, Clone, Copy)]
struct Recurse;

type Log = Arc<Mutex<Vec<String>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn logger(
    log: &Log,
    line: &'static str,
) -> impl Fn(&mut Registry, &Tick) -> Result<()> + Send + Sync + 'static + use<> {
    let log = Arc::clone(log);
    move |_, _| {
        log.lock().push(line.to_owned());
        Ok(())
    }
}

struct Gravity {
    accel: i32,
}

impl System<Update> for Gravity {
    fn process(&self, registry: &mut Registry, event: &Update) -> Result<()> {
        let dv = self.accel * event.dt;
        registry.for_joined_components_filtered::<(Velocity,), _, _>(
            !exists::<Anchored>(),
            |_, (vel,)| vel.y += dv,
        );
        Ok(())
    }
}

struct Movement;

impl System<Update> for Movement {
    fn process(&self, registry: &mut Registry, event: &Update) -> Result<()> {
        let dt = event.dt;
        registry.for_joined_components::<(Position, Velocity), _>(|_, (pos, vel)| {
            pos.x += vel.x * dt;
            pos.y += vel.y * dt;
        });
        Ok(())
    }
}

fn physics_world() -> (Registry, sparse_ecs::Entity) {
    let mut registry = Registry::new();
    registry
        .assign_feature("gravity")
        .add_system(Gravity { accel: -10 });
    registry.assign_feature("movement").add_system(Movement);

    let body = registry.create_entity().unwrap();
    registry.assign_component(body, Position { x: 0, y: 100 });
    registry.assign_component(body, Velocity { x: 2, y: 0 });
    (registry, body)
}

#[test]
fn test_features_run_in_registration_order() {
    init_tracing();
    let (mut registry, body) = physics_world();

    registry.process_event(Update { dt: 1 }).unwrap();
    // Gravity first: v.y = -10, then p.y = 100 - 10.
    assert_eq!(
        registry.get_component::<Velocity>(body).unwrap(),
        &Velocity { x: 2, y: -10 }
    );
    assert_eq!(
        registry.get_component::<Position>(body).unwrap(),
        &Position { x: 2, y: 90 }
    );

    registry.process_event(Update { dt: 2 }).unwrap();
    assert_eq!(
        registry.get_component::<Position>(body).unwrap(),
        &Position { x: 6, y: 30 }
    );
}

#[test]
fn test_disabled_feature_is_skipped() {
    let (mut registry, body) = physics_world();
    registry.get_feature_mut("gravity").unwrap().disable();

    registry.process_event(Update { dt: 3 }).unwrap();
    assert_eq!(
        registry.get_component::<Position>(body).unwrap(),
        &Position { x: 6, y: 100 }
    );

    registry.get_feature_mut("gravity").unwrap().enable();
    registry.assign_component(body, Anchored);
    registry.process_event(Update { dt: 1 }).unwrap();
    assert_eq!(
        registry.get_component::<Velocity>(body).unwrap(),
        &Velocity { x: 2, y: 0 }
    );

    registry.remove_component::<Anchored>(body);
    registry.process_event(Update { dt: 1 }).unwrap();
    assert_eq!(registry.get_component::<Velocity>(body).unwrap().y, -10);
}

#[test]
fn test_before_and_after_run_within_each_feature() {
    let log = Log::default();
    let mut registry = Registry::new();

    for name in ["a", "b"] {
        let before = Arc::clone(&log);
        let after = Arc::clone(&log);
        let feature = registry.assign_feature(name);
        feature
            .add_system_fn::<After<Tick>, _>(move |_, _| {
                after.lock().push(format!("{name}:after"));
                Ok(())
            })
            .add_system_fn::<Tick, _>(logger(&log, if name == "a" { "a:tick" } else { "b:tick" }))
            .add_system_fn::<Before<Tick>, _>(move |_, _| {
                before.lock().push(format!("{name}:before"));
                Ok(())
            });
    }

    registry.process_event(Tick).unwrap();
    assert_eq!(
        *log.lock(),
        ["a:before", "a:tick", "a:after", "b:before", "b:tick", "b:after"]
    );
}

#[derive(Debug, Clone, Copy)]
struct Physics {
    dt: i32,
}

#[derive(Debug, Clone, Copy)]
struct ClearVelocity;

#[test]
fn test_before_system_feeds_sibling_systems() {
    struct Stepper;

    impl System<Update> for Stepper {
        fn process(&self, registry: &mut Registry, event: &Update) -> Result<()> {
            registry.process_event(Physics { dt: event.dt })
        }
    }

    impl System<ClearVelocity> for Stepper {
        fn process(&self, registry: &mut Registry, _: &ClearVelocity) -> Result<()> {
            registry.remove_all_components_of::<Velocity>();
            Ok(())
        }
    }

    let mut registry = Registry::new();
    let stepper = Arc::new(Stepper);
    registry
        .assign_feature("physics")
        .add_system_fn::<Before<Physics>, _>(|registry, before| {
            let dv = 9 * before.event.dt;
            registry.for_each_component_filtered::<Velocity, _, _>(
                !exists::<Anchored>(),
                |_, vel| {
                    vel.x += dv;
                    vel.y += dv;
                },
            );
            Ok(())
        })
        .add_system_fn::<Physics, _>(|registry, physics| {
            let dt = physics.dt;
            registry.for_joined_components::<(Position, Velocity), _>(|_, (pos, vel)| {
                pos.x += vel.x * dt;
                pos.y += vel.y * dt;
            });
            Ok(())
        })
        .add_shared_system::<Update, _>(Arc::clone(&stepper))
        .add_shared_system::<ClearVelocity, _>(stepper);

    let body = registry.create_entity().unwrap();
    registry.assign_component(body, Position { x: 1, y: 2 });
    registry.assign_component(body, Velocity { x: 3, y: 4 });

    registry.process_event(Update { dt: 2 }).unwrap();
    assert_eq!(
        registry.get_component::<Position>(body).unwrap(),
        &Position {
            x: 1 + (3 + 9 * 2) * 2,
            y: 2 + (4 + 9 * 2) * 2,
        }
    );

    assert_eq!(registry.component_count::<Velocity>(), 1);
    registry.process_event(ClearVelocity).unwrap();
    assert_eq!(registry.component_count::<Velocity>(), 0);
}

#[test]
fn test_nested_events_complete_depth_first() {
    let log = Log::default();
    let mut registry = Registry::new();

    let outer_log = Arc::clone(&log);
    registry.assign_feature("a").add_system_fn::<Outer, _>(move |registry, _| {
        outer_log.lock().push("a:outer".to_owned());
        registry.process_event(Inner)?;
        outer_log.lock().push("a:outer done".to_owned());
        Ok(())
    });

    let inner_log = Arc::clone(&log);
    registry.assign_feature("b").add_system_fn::<Inner, _>(move |registry, _| {
        let depth = registry.dispatch_stack().len();
        inner_log.lock().push(format!("b:inner depth={depth}"));
        Ok(())
    });

    let late_log = Arc::clone(&log);
    registry.assign_feature("c").add_system_fn::<Outer, _>(move |_, _| {
        late_log.lock().push("c:outer".to_owned());
        Ok(())
    });

    registry.process_event(Outer).unwrap();
    assert_eq!(
        *log.lock(),
        ["a:outer", "b:inner depth=2", "a:outer done", "c:outer"]
    );
    assert!(registry.dispatch_stack().is_empty());
}

#[test]
fn test_system_error_stops_dispatch() {
    let log = Log::default();
    let mut registry = Registry::new();

    registry
        .assign_feature("failing")
        .add_system_fn::<Tick, _>(|_, _| Err(Error::system("boom")));
    registry
        .assign_feature("after")
        .add_system_fn::<Tick, _>(logger(&log, "should not run"));

    let err = registry.process_event(Tick).unwrap_err();
    assert!(matches!(err, Error::System(_)));
    assert_eq!(err.to_string(), "system failed: boom");
    assert!(log.lock().is_empty());
    assert!(registry.dispatch_stack().is_empty());
}

#[test]
fn test_dispatch_depth_limit() {
    let mut registry = Registry::with_config(RegistryConfig {
        max_dispatch_depth: 3,
        ..RegistryConfig::default()
    });
    let calls = Arc::new(Mutex::new(0));

    let counter = Arc::clone(&calls);
    registry
        .assign_feature("loop")
        .add_system_fn::<Recurse, _>(move |registry, _| {
            *counter.lock() += 1;
            registry.process_event(Recurse)
        });

    let err = registry.process_event(Recurse).unwrap_err();
    assert!(matches!(
        err,
        Error::DispatchDepthExceeded { limit: 3, .. }
    ));
    assert_eq!(*calls.lock(), 3);
    assert!(registry.dispatch_stack().is_empty());
}

#[test]
fn test_shared_system_handles_several_events() {
    struct Counter(Mutex<(u32, u32)>);

    impl System<Tick> for Counter {
        fn process(&self, _: &mut Registry, _: &Tick) -> Result<()> {
            self.0.lock().0 += 1;
            Ok(())
        }
    }

    impl System<Update> for Counter {
        fn process(&self, _: &mut Registry, event: &Update) -> Result<()> {
            self.0.lock().1 += event.dt.unsigned_abs();
            Ok(())
        }
    }

    let counter = Arc::new(Counter(Mutex::new((0, 0))));
    let mut feature = Feature::new("counting");
    feature
        .add_shared_system::<Tick, _>(Arc::clone(&counter))
        .add_shared_system::<Update, _>(Arc::clone(&counter));

    let mut registry = Registry::new();
    registry.insert_feature(feature);
    registry.process_event(Tick).unwrap();
    registry.process_event(Update { dt: 4 }).unwrap();
    registry.process_event(Tick).unwrap();

    assert_eq!(*counter.0.lock(), (2, 4));
    assert!(registry.get_feature("counting").unwrap().handles::<Update>());
    assert!(registry.remove_feature("counting").is_some());

    registry.process_event(Tick).unwrap();
    assert_eq!(counter.0.lock().0, 2);
}
