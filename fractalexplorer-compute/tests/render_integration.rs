use fractalexplorer_compute::{
    Complex, FractalEngine, FractalKind, FractalParams, GrayscalePalette, Palette, PassPlan, PixelBuffer,
    PointEvaluator, FormulaCache, RenderCallbacks, RenderLevel, RenderRequest, RenderScheduler,
    RenderStatus, SchedulerConfig, Viewport, AntiAlias, TileOrder,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scheduler(threads: usize) -> RenderScheduler {
    RenderScheduler::new(SchedulerConfig {
        threads: Some(threads),
        ..SchedulerConfig::default()
    })
    .unwrap()
}

fn mandelbrot_request(cx: f64, cy: f64, zoom: f64, size: (u32, u32), max_iter: u32) -> RenderRequest {
    RenderRequest::new(
        Viewport::from_f64(cx, cy, zoom, 64),
        size.0,
        size.1,
        FractalParams::new(FractalKind::Mandelbrot),
        max_iter,
    )
}

// A render heavy enough to still be running when the test reacts to it
fn heavy_request() -> RenderRequest {
    let mut request = mandelbrot_request(-0.743_643_9, 0.131_825_9, 300.0, (1024, 1024), 20_000);
    request.pass_plan = PassPlan::FullOnly;
    request
}

fn wait_for(buffer: &PixelBuffer, level: RenderLevel) {
    let deadline = Instant::now() + Duration::from_secs(30);
    while buffer.level_counts()[level as usize] == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn mandelbrot_reference_scenario() {
    init_logging();
    let request = mandelbrot_request(-0.5, 0.0, 1.0, (65, 65), 256);
    let outcome = scheduler(2).render(request, RenderCallbacks::new()).unwrap().wait();

    assert_eq!(outcome.status, RenderStatus::Complete);
    assert_eq!(outcome.buffer.full_resolution_percent(), 100.0);
    // centre pixel is the world point (-0.5, 0): inside, drawn black
    assert_eq!(outcome.buffer.color(32, 32), GrayscalePalette.color_value(256.0, 256));

    let mut engine = FractalEngine::default();
    engine.set_view(
        &Viewport::from_f64(-0.5, 0.0, 1.0, 64),
        &FractalParams::new(FractalKind::Mandelbrot),
        256,
    );
    let centre = engine.classify(-0.5, 0.0);
    assert!(centre.in_set && centre.value >= 255.5);
    // (2, 2) leaves the bailout radius on the third step: z = -94 + 42i
    let orbit = engine.orbit(2.0, 2.0, &FractalParams::new(FractalKind::Mandelbrot), 10);
    assert_eq!(orbit.len(), 4);
    assert_eq!(orbit[3], Complex::new(-94.0, 42.0));
    // |z|² = 10600 at n = 3 overshoots the bailout of 256 by far, so the
    // smooth count lands between 1 and 2
    let far = engine.classify(2.0, 2.0);
    assert!(!far.in_set && far.value > 1.0 && far.value < 1.5);
}

#[test]
fn full_pass_matches_point_evaluator() {
    let request = mandelbrot_request(-0.5, 0.0, 1.0, (48, 32), 128);
    let bounds = request.viewport.bounds(48, 32);
    let outcome = scheduler(3).render(request, RenderCallbacks::new()).unwrap().wait();

    let evaluator = PointEvaluator::new(
        &FractalParams::new(FractalKind::Mandelbrot),
        128,
        &FormulaCache::new(),
    );
    for (px, py) in [(0, 0), (10, 5), (24, 16), (47, 31)] {
        let (x, y) = bounds.pixel_to_world(px as f64, py as f64);
        let expected = GrayscalePalette.color_value(evaluator.evaluate(x, y), 128);
        assert_eq!(outcome.buffer.color(px, py), expected, "pixel ({}, {})", px, py);
    }
}

#[test]
fn every_plan_and_tile_order_fills_the_image() {
    for plan in [PassPlan::Progressive, PassPlan::Quick, PassPlan::FullOnly] {
        for order in [TileOrder::Spiral, TileOrder::Distance] {
            let scheduler = RenderScheduler::new(SchedulerConfig {
                threads: Some(2),
                tile_size: 16,
                tile_order: order,
                ..SchedulerConfig::default()
            })
            .unwrap();
            let mut request = mandelbrot_request(-0.5, 0.0, 1.0, (37, 23), 64);
            request.pass_plan = plan;
            let outcome = scheduler.render(request, RenderCallbacks::new()).unwrap().wait();
            assert_eq!(outcome.status, RenderStatus::Complete);
            assert_eq!(outcome.buffer.level_counts(), [0, 0, 0, 0, 37 * 23]);
        }
    }
}

#[test]
fn progress_callbacks_are_monotonic_and_reach_100() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let completed = Arc::new(Mutex::new(None));
    let callbacks = {
        let seen = Arc::clone(&seen);
        let completed = Arc::clone(&completed);
        RenderCallbacks::new()
            .on_progress(move |_, percent| seen.lock().unwrap().push(percent))
            .on_complete(move |outcome| *completed.lock().unwrap() = Some(outcome.status.clone()))
    };

    let request = mandelbrot_request(-0.5, 0.0, 1.0, (200, 150), 100);
    let handle = scheduler(4).render(request, callbacks).unwrap();
    handle.wait();

    let seen = seen.lock().unwrap();
    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "{:?}", seen);
    assert_eq!(*seen.last().unwrap(), 100.0);
    assert_eq!(*completed.lock().unwrap(), Some(RenderStatus::Complete));
}

#[test]
fn cancellation_stops_writes_within_a_tile_per_worker() {
    init_logging();
    let workers = 4;
    let scheduler = scheduler(workers);
    let handle = scheduler.render(heavy_request(), RenderCallbacks::new()).unwrap();
    wait_for(handle.buffer(), RenderLevel::Full);

    handle.cancel();
    let at_cancel = handle.buffer().level_counts()[RenderLevel::Full as usize];
    let outcome = handle.wait();

    assert_eq!(outcome.status, RenderStatus::Cancelled);
    let after = outcome.buffer.level_counts()[RenderLevel::Full as usize];
    let tile_area = 64 * 64;
    assert!(
        after - at_cancel <= workers * tile_area,
        "{} writes after cancel",
        after - at_cancel
    );
    assert!(outcome.buffer.full_resolution_percent() < 100.0);

    // cancelling again is harmless
    handle.cancel();
    assert!(handle.is_finished());
}

#[test]
fn new_render_for_same_target_cancels_previous() {
    let scheduler = scheduler(2);
    let first = scheduler.render(heavy_request(), RenderCallbacks::new()).unwrap();
    wait_for(first.buffer(), RenderLevel::Full);

    let second = scheduler
        .render(mandelbrot_request(-0.5, 0.0, 1.0, (32, 32), 64), RenderCallbacks::new())
        .unwrap();
    assert_ne!(first.id(), second.id());

    assert_eq!(first.wait().status, RenderStatus::Cancelled);
    assert_eq!(second.wait().status, RenderStatus::Complete);
}

#[test]
fn supersampled_render_completes() {
    let mut request = mandelbrot_request(-0.75, 0.1, 20.0, (32, 24), 200);
    request.anti_alias = AntiAlias::Supersample(2);
    let outcome = scheduler(2).render(request.clone(), RenderCallbacks::new()).unwrap().wait();
    assert_eq!(outcome.status, RenderStatus::Complete);

    request.anti_alias = AntiAlias::Adaptive(3);
    let adaptive = scheduler(2).render(request, RenderCallbacks::new()).unwrap().wait();
    assert_eq!(adaptive.status, RenderStatus::Complete);
    assert_eq!(adaptive.buffer.full_resolution_percent(), 100.0);
}

#[test]
fn every_family_renders() {
    let scheduler = scheduler(2);
    for kind in FractalKind::ALL {
        let params = if kind == FractalKind::Custom {
            FractalParams::custom("z^3 + c")
        } else {
            FractalParams::new(kind)
        };
        let request = RenderRequest::new(Viewport::default_for(kind), 24, 16, params, 50);
        let outcome = scheduler.render(request, RenderCallbacks::new()).unwrap().wait();
        assert_eq!(outcome.status, RenderStatus::Complete, "{:?}", kind);
        assert_eq!(outcome.buffer.full_resolution_percent(), 100.0, "{:?}", kind);
    }
}

#[test]
fn malformed_custom_formula_renders_as_mandelbrot() {
    let scheduler = scheduler(2);
    let viewport = Viewport::from_f64(-0.5, 0.0, 1.0, 64);
    let broken = scheduler
        .render(
            RenderRequest::new(viewport.clone(), 20, 20, FractalParams::custom("z^^2 + (c"), 64),
            RenderCallbacks::new(),
        )
        .unwrap()
        .wait();
    let reference = scheduler
        .render(
            RenderRequest::new(viewport, 20, 20, FractalParams::new(FractalKind::Mandelbrot), 64),
            RenderCallbacks::new(),
        )
        .unwrap()
        .wait();
    assert_eq!(broken.buffer.snapshot(), reference.buffer.snapshot());
}

#[test]
fn zoom_is_clamped_before_rendering() {
    let request = mandelbrot_request(-0.5, 0.0, 1e-9, (8, 8), 32);
    let outcome = scheduler(1).render(request, RenderCallbacks::new()).unwrap().wait();
    assert_eq!(outcome.status, RenderStatus::Complete);
}
