use super::*;

struct FixedWindow(Mutex<f64>);

impl FixedWindow {
    fn new(height: f64) -> Arc<Self> {
        Arc::new(Self(Mutex::new(height)))
    }

    fn resize(&self, height: f64) {
        *self.0.lock().expect("height") = height;
    }
}

impl WindowMetrics for FixedWindow {
    fn inner_height(&self) -> f64 {
        *self.0.lock().expect("height")
    }
}

fn record(viewport: &Viewport) -> Arc<Mutex<Vec<ViewportEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for kind in [
        ViewportEventKind::HeightCalculated,
        ViewportEventKind::ViewportChanged,
    ] {
        let seen = seen.clone();
        viewport.on(kind, move |event| seen.lock().expect("seen").push(*event));
    }
    seen
}

#[test]
fn host_update_emits_height_then_stability() {
    let window = FixedWindow::new(500.0);
    let viewport = Viewport::new(Some(window as Arc<dyn WindowMetrics>));
    let seen = record(&viewport);

    viewport.set_height(Some(ViewportUpdate {
        height: Some(500.0),
        stable_height: Some(500.0),
        is_state_stable: Some(true),
    }));
    viewport.set_height(None);

    assert_eq!(
        *seen.lock().expect("seen"),
        vec![
            ViewportEvent::HeightCalculated {
                height: 500.0,
                stable_height: 500.0
            },
            ViewportEvent::ViewportChanged {
                is_state_stable: true
            },
        ]
    );
    assert!(viewport.is_expanded());
}

#[test]
fn fallback_emits_only_when_height_changes() {
    let window = FixedWindow::new(640.0);
    let viewport = Viewport::new(Some(window.clone() as Arc<dyn WindowMetrics>));
    let seen = record(&viewport);

    viewport.set_height(None);
    viewport.set_height(None);
    window.resize(700.0);
    viewport.set_height(None);

    assert_eq!(
        *seen.lock().expect("seen"),
        vec![
            ViewportEvent::ViewportChanged {
                is_state_stable: true
            };
            2
        ]
    );
    assert_eq!(viewport.height(), 700.0);
    assert_eq!(viewport.stable_height(), 700.0);
}

#[test]
fn host_values_take_precedence_over_window() {
    let window = FixedWindow::new(800.0);
    let viewport = Viewport::new(Some(window.clone() as Arc<dyn WindowMetrics>));

    viewport.set_height(Some(ViewportUpdate {
        height: Some(420.0),
        stable_height: Some(420.0),
        is_state_stable: Some(true),
    }));
    window.resize(900.0);
    viewport.set_height(None);

    assert_eq!(viewport.height(), 420.0);
}

#[test]
fn unstable_host_height_keeps_previous_stable_height() {
    let viewport = Viewport::new(None);
    viewport.set_height(Some(ViewportUpdate {
        height: Some(600.0),
        stable_height: Some(600.0),
        is_state_stable: Some(true),
    }));

    viewport.set_height(Some(ViewportUpdate {
        height: Some(450.0),
        stable_height: None,
        is_state_stable: Some(false),
    }));

    let state = viewport.state();
    assert_eq!(state.height, 450.0);
    assert_eq!(state.stable_height, 600.0);
    assert!(!state.is_expanded);
}

#[test]
fn stability_flag_alone_emits_only_viewport_changed() {
    let viewport = Viewport::new(None);
    let seen = record(&viewport);

    viewport.set_height(Some(ViewportUpdate {
        is_state_stable: Some(false),
        ..ViewportUpdate::default()
    }));

    assert_eq!(
        *seen.lock().expect("seen"),
        vec![ViewportEvent::ViewportChanged {
            is_state_stable: false
        }]
    );
}

#[test]
fn fallback_without_window_is_a_no_op() {
    let viewport = Viewport::new(None);
    let seen = record(&viewport);
    viewport.set_height(None);
    assert!(seen.lock().expect("seen").is_empty());
}
