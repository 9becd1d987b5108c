//! End-to-end host scenarios on a manual (virtual clock) host.

use explorable_env::{HostContext, InstanceId, ManualHost, ManualIntersection};
use explorable_simlib::draw::PaintOp;
use explorable_simlib::{
    Color, ControlRegistry, DrawingEngine, FailurePhase, FrameDriver, FrameOutcome,
    HeadlessContainer, Lifecycle, MountOptions, RenderContext, SchedulerConfig, SimError,
    Simulation, SimulationHost, SimulationInfo, SliderSpec, UpdateContext,
};
use kurbo::Shape as _;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
struct Position {
    x: f64,
}

/// x' = x + dt, optionally failing on a given update call.
#[derive(Default)]
struct Walker {
    fail_on_update: Option<u64>,
    /// Indexes an empty trail on this update call
    panic_on_update: Option<u64>,
    bad_render: bool,
    update_calls: Rc<Cell<u64>>,
    render_calls: Rc<Cell<u64>>,
}

impl Simulation for Walker {
    type State = Position;

    fn info(&self) -> SimulationInfo {
        SimulationInfo::new("Walker", "Moves right at unit speed")
    }

    fn controls(&mut self, registry: &mut ControlRegistry) {
        registry.add_slider("k", SliderSpec::new(0.3, 0.0, 2.0, 0.01), "Coupling");
        registry.add_checkbox("trail", false, "Show trail");
    }

    fn init(&mut self) -> Position {
        Position { x: 0.0 }
    }

    fn update(&mut self, ctx: &UpdateContext<'_>, state: Position) -> Result<Position, SimError> {
        let call = self.update_calls.get() + 1;
        self.update_calls.set(call);
        if self.fail_on_update == Some(call) {
            return Err(SimError::logic("walker fell off"));
        }
        if self.panic_on_update == Some(call) {
            let trail: Vec<f64> = Vec::new();
            let _ = trail[call as usize + 2];
        }
        Ok(Position { x: state.x + ctx.dt })
    }

    fn render(
        &self,
        ctx: &RenderContext<'_, Position>,
        engine: &mut DrawingEngine<'_>,
    ) -> Result<(), SimError> {
        self.render_calls.set(self.render_calls.get() + 1);
        engine.clear(Some(Color::WHITE))?;
        if self.bad_render {
            engine.svg("M 0 0 X 1 1").draw()?;
        }
        engine
            .circle(0.05)
            .translate(ctx.state.x.fract(), 0.5)
            .fill(Color::BLACK)
            .draw()?;
        Ok(())
    }
}

type Mounted = SimulationHost<Walker, HeadlessContainer, ManualHost>;

fn mount_with(host: &Rc<ManualHost>, sim: Walker, scheduler: SchedulerConfig) -> Mounted {
    SimulationHost::mount(
        Rc::clone(host),
        HeadlessContainer::new(200.0, 100.0),
        sim,
        MountOptions {
            scheduler,
            instance_id: Some(InstanceId::from_seed(7)),
            ..Default::default()
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_three_half_second_ticks_reach_one_and_a_half() {
    let host = Rc::new(ManualHost::with_frame_interval(Duration::from_millis(500)));
    let mut mounted = mount_with(&host, Walker::default(), SchedulerConfig::uncapped());
    mounted.set_visible(true);

    let mut driver = FrameDriver::new(Rc::clone(&host));
    driver.run(&mut [&mut mounted], 3).await;

    assert_eq!(mounted.instance().update_count(), 3);
    assert_eq!(mounted.instance().state(), Some(&Position { x: 1.5 }));
}

#[test]
fn test_slider_change_reaches_live_map() {
    let host = ManualHost::shared();
    let mounted = mount_with(&host, Walker::default(), SchedulerConfig::default());
    let values = mounted.controls().values();

    // Seeded with the declared initial value
    assert_eq!(values.number("k"), Some(0.3));
    assert_eq!(values.flag("trail"), Some(false));

    mounted.controls().descriptor("k").unwrap().on_change(1.1);
    assert_eq!(values.number("k"), Some(1.1));
}

#[tokio::test]
async fn test_hidden_simulation_does_not_tick() {
    let host = Rc::new(ManualHost::with_frame_interval(Duration::from_millis(10)));
    let viewport = ManualIntersection::new();
    let sim = Walker::default();
    let (updates, renders) = (Rc::clone(&sim.update_calls), Rc::clone(&sim.render_calls));
    let mut mounted = mount_with(&host, sim, SchedulerConfig::uncapped());
    mounted.attach_visibility(&viewport);
    let mut driver = FrameDriver::new(Rc::clone(&host));

    // Never visible yet
    driver.run(&mut [&mut mounted], 5).await;
    assert_eq!((updates.get(), renders.get()), (0, 0));

    viewport.set_intersecting(true);
    driver.run(&mut [&mut mounted], 4).await;
    let (u, r) = (updates.get(), renders.get());
    assert!(u > 0 && r > 0);

    viewport.set_intersecting(false);
    driver.run(&mut [&mut mounted], 50).await;
    assert_eq!((updates.get(), renders.get()), (u, r));
    assert_eq!(mounted.pending_frame(), None);
    assert_eq!(mounted.instance().lifecycle(), Lifecycle::Suspended);

    // Back in view: dt restarts from the regain moment
    let x_before = mounted.instance().state().unwrap().x;
    viewport.set_intersecting(true);
    driver.run(&mut [&mut mounted], 2).await;
    let x_after = mounted.instance().state().unwrap().x;
    assert!((x_after - x_before - 0.01).abs() < 1e-12);
}

#[tokio::test]
async fn test_failing_update_shows_fallback_until_retry() {
    let host = Rc::new(ManualHost::with_frame_interval(Duration::from_millis(10)));
    let sim = Walker {
        fail_on_update: Some(3),
        ..Default::default()
    };
    let updates = Rc::clone(&sim.update_calls);
    let mut mounted = mount_with(&host, sim, SchedulerConfig::uncapped());
    mounted.set_visible(true);
    let mut driver = FrameDriver::new(Rc::clone(&host));

    let stats = driver.run(&mut [&mut mounted], 10).await;
    assert_eq!(stats.failures, 1);
    assert_eq!(updates.get(), 3);
    assert_eq!(mounted.instance().lifecycle(), Lifecycle::Failed);
    assert_eq!(mounted.pending_frame(), None);

    let view = mounted.view();
    let fallback = view.fallback.expect("fallback panel");
    assert_eq!(fallback.action, "Try again");
    assert!(fallback.message.contains("walker fell off"));
    assert_eq!(
        mounted.boundary().failure().map(|f| f.phase),
        Some(FailurePhase::Update)
    );

    // Halted: no further calls
    driver.run(&mut [&mut mounted], 10).await;
    assert_eq!(updates.get(), 3);

    // Retry restarts from init, not from the crashed state
    assert!(mounted.retry());
    assert_eq!(mounted.instance().state(), Some(&Position { x: 0.0 }));
    assert!(mounted.view().fallback.is_none());
    driver.run(&mut [&mut mounted], 2).await;
    assert_eq!(updates.get(), 5);
    assert_eq!(mounted.boundary().retries(), 1);
}

#[test]
fn test_malformed_path_in_render_trips_boundary() {
    let host = Rc::new(ManualHost::with_frame_interval(Duration::from_millis(10)));
    let sim = Walker {
        bad_render: true,
        ..Default::default()
    };
    let mut mounted = mount_with(&host, sim, SchedulerConfig::uncapped());
    mounted.set_visible(true);

    host.step();
    let due = host.take_due_frames();
    assert_eq!(mounted.on_frame(due[0]), FrameOutcome::Failed);
    assert_eq!(
        mounted.boundary().failure().map(|f| f.phase),
        Some(FailurePhase::Render)
    );
    // Surface state is balanced even though the draw failed
    assert_eq!(mounted.surface().save_depth(), 0);
}

#[tokio::test]
async fn test_update_and_render_rates_are_independent() {
    let host = Rc::new(ManualHost::with_frame_interval(Duration::from_millis(10)));
    let config = SchedulerConfig {
        max_update_hz: 100.0,
        max_render_hz: 25.0,
    };
    let mut mounted = mount_with(&host, Walker::default(), config);
    mounted.set_visible(true);

    let mut driver = FrameDriver::new(Rc::clone(&host));
    let stats = driver.run(&mut [&mut mounted], 100).await;

    assert_eq!(stats.updates, 100);
    assert_eq!(stats.renders, 25);
}

#[tokio::test]
async fn test_render_sees_latest_state() {
    let host = Rc::new(ManualHost::with_frame_interval(Duration::from_millis(250)));
    let mut mounted = mount_with(&host, Walker::default(), SchedulerConfig::uncapped());
    mounted.set_visible(true);

    let mut driver = FrameDriver::new(Rc::clone(&host));
    driver.run(&mut [&mut mounted], 1).await;

    // x = 0.25 after one update: circle center at 0.25 × 200px
    let center = match mounted.surface().ops().last() {
        Some(PaintOp::Fill {
            path, transform, ..
        }) => (*transform * path.clone()).bounding_box().center(),
        other => panic!("expected a fill, got {other:?}"),
    };
    assert!((center.x - 50.0).abs() < 1e-9);
    assert!((center.y - 50.0).abs() < 1e-9);
}

#[test]
fn test_unmount_cancels_frame_and_detaches_observer() {
    let host = ManualHost::shared();
    let viewport = ManualIntersection::new();
    let mut mounted = mount_with(&host, Walker::default(), SchedulerConfig::default());
    mounted.attach_visibility(&viewport);
    viewport.set_intersecting(true);
    mounted.dispatch_events();

    let handle = mounted.pending_frame().unwrap();
    assert_eq!(viewport.observer_count(), 1);

    mounted.unmount();
    assert!(!host.is_outstanding(handle));
    assert_eq!(viewport.observer_count(), 0);
    host.step();
    assert!(host.take_due_frames().is_empty());
}

#[tokio::test]
async fn test_failure_is_isolated_per_instance() {
    let host = Rc::new(ManualHost::with_frame_interval(Duration::from_millis(10)));
    let mut broken = mount_with(
        &host,
        Walker {
            fail_on_update: Some(1),
            ..Default::default()
        },
        SchedulerConfig::uncapped(),
    );
    let mut healthy = mount_with(&host, Walker::default(), SchedulerConfig::uncapped());
    broken.set_visible(true);
    healthy.set_visible(true);

    let mut driver = FrameDriver::new(Rc::clone(&host));
    driver.run(&mut [&mut broken, &mut healthy], 20).await;

    assert_eq!(broken.instance().lifecycle(), Lifecycle::Failed);
    assert_eq!(healthy.instance().lifecycle(), Lifecycle::Running);
    assert_eq!(healthy.instance().update_count(), 20);
}

#[test]
fn test_view_serializes_for_the_control_ui() {
    let host = Rc::new(ManualHost::new().with_pixel_ratio(2.0));
    let mounted = mount_with(&host, Walker::default(), SchedulerConfig::default());
    let view = mounted.view();

    assert_eq!(view.surface.pixel_width, 400);
    assert_eq!(view.surface.pixel_height, 200);
    assert_eq!(view.controls.len(), 2);

    let json: serde_json::Value = serde_json::from_str(&view.to_json().unwrap()).unwrap();
    assert_eq!(json["title"], "Walker");
    assert_eq!(json["controls"][0]["id"], "k");
    assert_eq!(json["controls"][0]["kind"], "slider");
    assert_eq!(json["controls"][0]["max"], 2.0);
    assert_eq!(json["controls"][1]["value"], false);
    assert!(json["fallback"].is_null());

    // Host context reports the ratio the surface was sized with
    assert_eq!(host.device_pixel_ratio(), 2.0);
}

#[tokio::test]
async fn test_panic_is_isolated_per_instance() {
    let host = Rc::new(ManualHost::with_frame_interval(Duration::from_millis(10)));
    let broken_calls = Rc::new(Cell::new(0));
    let mut broken = mount_with(
        &host,
        Walker {
            panic_on_update: Some(1),
            update_calls: Rc::clone(&broken_calls),
            ..Default::default()
        },
        SchedulerConfig::uncapped(),
    );
    let mut healthy = mount_with(&host, Walker::default(), SchedulerConfig::uncapped());
    broken.set_visible(true);
    healthy.set_visible(true);

    let mut driver = FrameDriver::new(Rc::clone(&host));
    let stats = driver.run(&mut [&mut broken, &mut healthy], 5).await;

    assert_eq!(stats.failures, 1);
    assert_eq!(broken.instance().lifecycle(), Lifecycle::Failed);
    assert_eq!(broken_calls.get(), 1);
    let failure = broken.boundary().failure().expect("boundary tripped");
    assert_eq!(failure.phase, FailurePhase::Update);
    assert!(failure.message.contains("index out of bounds"), "{}", failure.message);
    assert!(broken.view().fallback.is_some());

    assert_eq!(healthy.instance().lifecycle(), Lifecycle::Running);
    assert_eq!(healthy.instance().update_count(), 5);

    // Try again restarts from init and keeps ticking past the bad call
    assert!(broken.retry());
    driver.run(&mut [&mut broken, &mut healthy], 3).await;
    assert_eq!(broken.instance().lifecycle(), Lifecycle::Running);
    assert_eq!(broken.instance().update_count(), 3);
}
