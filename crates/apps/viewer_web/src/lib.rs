//! Presentation controller for the 3D phone showcase.
//!
//! Owns the UI state (catalog, current selection, interaction flags), wires
//! the DOM, and drives the animation loop. The scene itself lives in the
//! `scene` crate; GPU plumbing in [`wgpu`].

use std::cell::RefCell;

use gloo_events::{EventListener, EventListenerOptions};
use gloo_net::http::Request;
use gloo_render::{AnimationFrame, request_animation_frame};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, MouseEvent, TouchEvent, WheelEvent};

use catalog::{Catalog, Coord3, PhoneRecord, PhoneSpecs};
use scene::showcase::LoadOutcome;
use scene::{InteractionState, LightRig, OrbitCamera, Placement, Showcase};

mod wgpu;
use wgpu::{
    FrameParams, GpuContext, clear_model, gpu_aspect, gpu_canvas, init_gpu, render_frame,
    resize_gpu, set_model_mesh,
};

const CATALOG_URL: &str = "/api/phones";

/// Error banners dismiss themselves after this long.
const BANNER_TIMEOUT_MS: i32 = 5000;

#[derive(Debug)]
struct DomRefs {
    container: Element,
    menu: Element,
    name: Element,
    screen_size: Element,
    processor: Element,
    camera: Element,
    battery: Element,
    storage: Element,
    auto_rotate_btn: Option<Element>,
}

/// Which hold-button a DOM listener feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldControl {
    RotateLeft,
    RotateRight,
    ZoomIn,
    ZoomOut,
}

impl HoldControl {
    fn element_id(self) -> &'static str {
        match self {
            HoldControl::RotateLeft => "rotate-left",
            HoldControl::RotateRight => "rotate-right",
            HoldControl::ZoomIn => "zoom-in",
            HoldControl::ZoomOut => "zoom-out",
        }
    }
}

struct ViewerState {
    catalog: Catalog,
    current_phone: Option<String>,
    flags: InteractionState,
    showcase: Showcase,
    camera: OrbitCamera,
    lights: LightRig,
    gpu: Option<GpuContext>,
    dom: Option<DomRefs>,
    listeners: Vec<EventListener>,
    raf: Option<AnimationFrame>,
    last_frame_ms: Option<f64>,
}

impl ViewerState {
    fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            current_phone: None,
            flags: InteractionState::new(),
            showcase: Showcase::new(),
            camera: OrbitCamera::new(),
            lights: LightRig::default(),
            gpu: None,
            dom: None,
            listeners: Vec::new(),
            raf: None,
            last_frame_ms: None,
        }
    }
}

thread_local! {
    static STATE: RefCell<ViewerState> = RefCell::new(ViewerState::new());
}

/// Safe TLS access; returns a default on teardown instead of panicking.
fn with_state<F, R>(f: F) -> R
where
    F: FnOnce(&RefCell<ViewerState>) -> R,
    R: Default,
{
    STATE.try_with(f).unwrap_or_default()
}

fn now_seconds() -> f64 {
    js_sys::Date::now() / 1000.0
}

fn console_error(msg: &str) {
    web_sys::console::error_1(&JsValue::from_str(msg));
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    Ok(())
}

/// Entry point: fetch the catalog from the backend, then bring the page up.
#[wasm_bindgen]
pub fn start_showcase() {
    spawn_local(run_showcase(None));
}

/// Standalone demo entry point: same page, catalog baked in, nothing fetched.
#[wasm_bindgen]
pub fn start_showcase_demo() {
    spawn_local(run_showcase(Some(demo_catalog())));
}

async fn run_showcase(preloaded: Option<Catalog>) {
    let catalog = match preloaded {
        Some(catalog) => catalog,
        None => match fetch_catalog().await {
            Ok(catalog) => catalog,
            Err(msg) => {
                console_error(&format!("catalog fetch failed: {msg}"));
                show_error_banner("Could not load phone data. Please refresh and try again.");
                return;
            }
        },
    };

    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };

    let dom = match resolve_dom_refs(&document) {
        Ok(dom) => dom,
        Err(msg) => {
            console_error(&msg);
            show_error_banner("The showcase page is missing required elements.");
            return;
        }
    };

    let gpu = match init_gpu(&dom.container).await {
        Ok(gpu) => gpu,
        Err(err) => {
            console_error(&format!("gpu init failed: {err:?}"));
            show_error_banner("3D view is unavailable on this browser.");
            return;
        }
    };

    let first = catalog.first_id().map(str::to_string);
    with_state(|state| {
        let mut s = state.borrow_mut();
        s.catalog = catalog;
        s.dom = Some(dom);
        s.gpu = Some(gpu);
    });

    build_menu(&document);
    wire_controls(&document);
    wire_canvas(&document);
    wire_resize();

    if let Some(id) = first {
        change_phone(id);
    }

    schedule_frame();
}

// ============================================================================
// Data source
// ============================================================================

async fn fetch_catalog() -> Result<Catalog, String> {
    let resp = Request::get(CATALOG_URL)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    let text = resp.text().await.map_err(|e| e.to_string())?;
    Catalog::from_json(&text).map_err(|e| e.to_string())
}

async fn fetch_record(id: &str) -> Result<PhoneRecord, String> {
    let resp = Request::get(&format!("{CATALOG_URL}/{id}"))
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    let text = resp.text().await.map_err(|e| e.to_string())?;
    Catalog::parse_record(&text).map_err(|e| e.to_string())
}

async fn fetch_model_bytes(path: &str) -> Result<Vec<u8>, String> {
    let resp = Request::get(path).send().await.map_err(|e| e.to_string())?;
    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    resp.binary().await.map_err(|e| e.to_string())
}

// ============================================================================
// Selection
// ============================================================================

fn change_phone(id: String) {
    spawn_local(async move {
        // Lazily fetch records the initial catalog didn't carry.
        let known = with_state(|state| state.borrow().catalog.contains(&id));
        if !known {
            match fetch_record(&id).await {
                Ok(record) => with_state(|state| {
                    state.borrow_mut().catalog.insert(id.clone(), record);
                }),
                Err(msg) => {
                    console_error(&format!("record fetch failed for {id}: {msg}"));
                    show_error_banner("Could not load phone data. Please try again later.");
                    // Selection stays where it was.
                    return;
                }
            }
        }

        let Some(record) = with_state(|state| state.borrow().catalog.get(&id).cloned()) else {
            return;
        };

        // The selection commits before the load; a failed load shows the
        // placeholder under this phone's specs, not the previous phone's.
        with_state(|state| {
            state.borrow_mut().current_phone = Some(id.clone());
        });
        update_info_panel(&record);
        update_menu_active(&id);

        let ticket = with_state(|state| {
            let mut s = state.borrow_mut();
            let ticket = s.showcase.begin_load();
            if let Some(gpu) = s.gpu.as_mut() {
                clear_model(gpu);
            }
            Some(ticket)
        });
        let Some(ticket) = ticket else { return };

        let loaded = match fetch_model_bytes(&record.model_path).await {
            Ok(bytes) => formats::decode_glb(&bytes).map_err(|e| e.to_string()),
            Err(msg) => Err(msg),
        };

        match loaded {
            Ok(mesh) => {
                let placement = Placement::from_record(&record);
                let outcome = with_state(|state| {
                    let mut s = state.borrow_mut();
                    let outcome = s.showcase.finish_load(ticket, placement);
                    if outcome == LoadOutcome::Applied {
                        if let Some(gpu) = s.gpu.as_mut() {
                            set_model_mesh(gpu, &mesh);
                        }
                        s.flags.start_auto_rotation();
                    }
                    Some(outcome)
                });
                if outcome == Some(LoadOutcome::Applied) {
                    refresh_auto_rotate_button();
                }
            }
            Err(cause) => {
                let outcome = with_state(|state| {
                    let mut s = state.borrow_mut();
                    let outcome = s.showcase.fail_load(ticket);
                    if outcome == LoadOutcome::Applied {
                        let mesh = formats::placeholder(formats::DEFAULT_PLACEHOLDER_COLOR);
                        if let Some(gpu) = s.gpu.as_mut() {
                            set_model_mesh(gpu, &mesh);
                        }
                    }
                    Some(outcome)
                });
                if outcome == Some(LoadOutcome::Applied) {
                    console_error(&format!(
                        "model load failed for {}: {cause}",
                        record.model_path
                    ));
                    show_error_banner("Could not load the phone model. Showing a stand-in.");
                }
                // A stale failure belongs to a superseded load; drop it.
            }
        }
    });
}

fn update_info_panel(record: &PhoneRecord) {
    with_state(|state| {
        let s = state.borrow();
        let Some(dom) = s.dom.as_ref() else { return };
        dom.name.set_text_content(Some(&record.name));
        dom.screen_size
            .set_text_content(Some(&record.specs.screen_size));
        dom.processor.set_text_content(Some(&record.specs.processor));
        dom.camera.set_text_content(Some(&record.specs.camera));
        dom.battery.set_text_content(Some(&record.specs.battery));
        dom.storage.set_text_content(Some(&record.specs.storage));
    });
}

fn update_menu_active(id: &str) {
    with_state(|state| {
        let s = state.borrow();
        let Some(dom) = s.dom.as_ref() else { return };
        let Ok(anchors) = dom.menu.query_selector_all("a") else {
            return;
        };
        for i in 0..anchors.length() {
            let Some(node) = anchors.item(i) else { continue };
            let Ok(anchor) = node.dyn_into::<Element>() else {
                continue;
            };
            let is_current = anchor.get_attribute("data-model").as_deref() == Some(id);
            let _ = anchor.class_list().toggle_with_force("active", is_current);
        }
    });
}

// ============================================================================
// DOM wiring
// ============================================================================

fn required_element(document: &Document, id: &str) -> Result<Element, String> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| format!("required element #{id} is missing"))
}

fn resolve_dom_refs(document: &Document) -> Result<DomRefs, String> {
    Ok(DomRefs {
        container: required_element(document, "canvas-container")?,
        menu: required_element(document, "phone-menu")?,
        name: required_element(document, "phone-name")?,
        screen_size: required_element(document, "screen-size")?,
        processor: required_element(document, "processor")?,
        camera: required_element(document, "camera")?,
        battery: required_element(document, "battery")?,
        storage: required_element(document, "storage")?,
        auto_rotate_btn: document.get_element_by_id("auto-rotate"),
    })
}

fn build_menu(document: &Document) {
    let entries: Vec<(String, String)> = with_state(|state| {
        state
            .borrow()
            .catalog
            .entries()
            .map(|(id, record)| (id.to_string(), record.name.clone()))
            .collect()
    });

    let mut listeners = Vec::new();
    with_state(|state| {
        let s = state.borrow();
        let Some(dom) = s.dom.as_ref() else { return };
        dom.menu.set_inner_html("");

        for (index, (id, name)) in entries.iter().enumerate() {
            let Ok(li) = document.create_element("li") else {
                continue;
            };
            let Ok(anchor) = document.create_element("a") else {
                continue;
            };
            let _ = anchor.set_attribute("href", "#");
            let _ = anchor.set_attribute("data-model", id);
            anchor.set_text_content(Some(name));
            if index == 0 {
                let _ = anchor.class_list().add_1("active");
            }

            let id = id.clone();
            listeners.push(EventListener::new(&anchor, "click", move |event| {
                event.prevent_default();
                change_phone(id.clone());
            }));

            let _ = li.append_child(&anchor);
            let _ = dom.menu.append_child(&li);
        }
    });

    with_state(|state| state.borrow_mut().listeners.extend(listeners.drain(..)));
}

fn wire_controls(document: &Document) {
    let mut listeners = Vec::new();

    for control in [
        HoldControl::RotateLeft,
        HoldControl::RotateRight,
        HoldControl::ZoomIn,
        HoldControl::ZoomOut,
    ] {
        // Missing optional buttons are tolerated; nothing gets wired.
        let Some(button) = document.get_element_by_id(control.element_id()) else {
            continue;
        };
        for event in ["mousedown", "touchstart"] {
            listeners.push(EventListener::new(&button, event, move |_| {
                set_hold(control, true);
            }));
        }
        for event in ["mouseup", "mouseleave", "touchend"] {
            listeners.push(EventListener::new(&button, event, move |_| {
                set_hold(control, false);
            }));
        }
    }

    if let Some(button) = document.get_element_by_id("auto-rotate") {
        listeners.push(EventListener::new(&button, "click", move |_| {
            with_state(|state| state.borrow_mut().flags.toggle_auto_rotation());
            refresh_auto_rotate_button();
        }));
    }

    with_state(|state| state.borrow_mut().listeners.extend(listeners.drain(..)));
}

fn set_hold(control: HoldControl, held: bool) {
    with_state(|state| {
        let mut s = state.borrow_mut();
        match control {
            HoldControl::RotateLeft => s.flags.rotate_left = held,
            HoldControl::RotateRight => s.flags.rotate_right = held,
            HoldControl::ZoomIn => s.flags.zoom_in = held,
            HoldControl::ZoomOut => s.flags.zoom_out = held,
        }
    });
}

fn refresh_auto_rotate_button() {
    with_state(|state| {
        let s = state.borrow();
        let Some(dom) = s.dom.as_ref() else { return };
        if let Some(button) = dom.auto_rotate_btn.as_ref() {
            let _ = button
                .class_list()
                .toggle_with_force("active", s.flags.auto_rotating);
        }
    });
}

fn wire_canvas(_document: &Document) {
    let canvas = with_state(|state| {
        state
            .borrow()
            .gpu
            .as_ref()
            .and_then(|gpu| gpu_canvas(gpu))
    });
    let Some(canvas) = canvas else { return };

    let mut listeners = Vec::new();

    listeners.push(EventListener::new(&canvas, "mousedown", move |event| {
        let Some(event) = event.dyn_ref::<MouseEvent>() else {
            return;
        };
        let pos = [event.offset_x() as f64, event.offset_y() as f64];
        with_state(|state| {
            let mut s = state.borrow_mut();
            // Grabbing the camera is manual intent.
            s.flags.on_drag_start();
            s.camera.on_pointer_down(pos, now_seconds());
        });
        refresh_auto_rotate_button();
    }));

    listeners.push(EventListener::new(&canvas, "mousemove", move |event| {
        let Some(event) = event.dyn_ref::<MouseEvent>() else {
            return;
        };
        let pos = [event.offset_x() as f64, event.offset_y() as f64];
        with_state(|state| {
            state.borrow_mut().camera.on_pointer_move(pos, now_seconds());
        });
    }));

    for event in ["mouseup", "mouseleave"] {
        listeners.push(EventListener::new(&canvas, event, move |_| {
            with_state(|state| state.borrow_mut().camera.on_pointer_up());
        }));
    }

    listeners.push(EventListener::new_with_options(
        &canvas,
        "wheel",
        EventListenerOptions::enable_prevent_default(),
        move |event| {
            let Some(event) = event.dyn_ref::<WheelEvent>() else {
                return;
            };
            event.prevent_default();
            if event.delta_y() == 0.0 {
                return;
            }
            with_state(|state| {
                let mut s = state.borrow_mut();
                s.flags.stop_auto_rotation();
                s.camera.zoom_step(event.delta_y().signum());
            });
            refresh_auto_rotate_button();
        },
    ));

    listeners.push(EventListener::new(&canvas, "touchstart", move |event| {
        let Some(event) = event.dyn_ref::<TouchEvent>() else {
            return;
        };
        let Some(touch) = event.touches().item(0) else {
            return;
        };
        let pos = [touch.client_x() as f64, touch.client_y() as f64];
        with_state(|state| {
            let mut s = state.borrow_mut();
            s.flags.on_drag_start();
            s.camera.on_pointer_down(pos, now_seconds());
        });
        refresh_auto_rotate_button();
    }));

    listeners.push(EventListener::new(&canvas, "touchmove", move |event| {
        let Some(event) = event.dyn_ref::<TouchEvent>() else {
            return;
        };
        let Some(touch) = event.touches().item(0) else {
            return;
        };
        let pos = [touch.client_x() as f64, touch.client_y() as f64];
        with_state(|state| {
            state.borrow_mut().camera.on_pointer_move(pos, now_seconds());
        });
    }));

    listeners.push(EventListener::new(&canvas, "touchend", move |_| {
        with_state(|state| state.borrow_mut().camera.on_pointer_up());
    }));

    with_state(|state| state.borrow_mut().listeners.extend(listeners.drain(..)));
}

fn wire_resize() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let listener = EventListener::new(&window, "resize", move |_| {
        with_state(|state| {
            let mut s = state.borrow_mut();
            let (width, height) = match s.dom.as_ref() {
                Some(dom) => (
                    dom.container.client_width().max(1) as u32,
                    dom.container.client_height().max(1) as u32,
                ),
                None => return,
            };
            if let Some(gpu) = s.gpu.as_mut() {
                resize_gpu(gpu, width, height);
            }
        });
    });
    with_state(|state| state.borrow_mut().listeners.push(listener));
}

// ============================================================================
// Error banner
// ============================================================================

fn show_error_banner(message: &str) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    if let Err(err) = build_banner(&document, message) {
        console_error(&format!("banner construction failed: {err:?}"));
    }
}

fn build_banner(document: &Document, message: &str) -> Result<(), JsValue> {
    let banner: web_sys::HtmlElement = document.create_element("div")?.dyn_into()?;
    banner.set_class_name("error-message");
    let style = banner.style();
    style.set_property("position", "fixed")?;
    style.set_property("top", "10px")?;
    style.set_property("left", "50%")?;
    style.set_property("transform", "translateX(-50%)")?;
    style.set_property("background-color", "rgba(255, 0, 0, 0.8)")?;
    style.set_property("color", "white")?;
    style.set_property("padding", "15px")?;
    style.set_property("border-radius", "5px")?;
    style.set_property("z-index", "1000")?;
    style.set_property("text-align", "center")?;
    style.set_property("box-shadow", "0 0 10px rgba(0, 0, 0, 0.5)")?;
    banner.set_text_content(Some(message));

    let close: web_sys::HtmlElement = document.create_element("button")?.dyn_into()?;
    close.set_text_content(Some("\u{00d7}"));
    let close_style = close.style();
    close_style.set_property("margin-left", "10px")?;
    close_style.set_property("background-color", "transparent")?;
    close_style.set_property("border", "none")?;
    close_style.set_property("color", "white")?;
    close_style.set_property("font-size", "20px")?;
    close_style.set_property("cursor", "pointer")?;

    let banner_for_close = banner.clone();
    let on_close = Closure::wrap(Box::new(move || {
        banner_for_close.remove();
    }) as Box<dyn FnMut()>);
    close.add_event_listener_with_callback("click", on_close.as_ref().unchecked_ref())?;
    on_close.forget();

    banner.append_child(&close)?;
    document
        .body()
        .ok_or_else(|| JsValue::from_str("document body missing"))?
        .append_child(&banner)?;

    // Self-dismiss; the timer is independent of whatever failed.
    let banner_for_timer = banner.clone();
    let on_timeout = Closure::once_into_js(move || {
        banner_for_timer.remove();
    });
    web_sys::window()
        .ok_or_else(|| JsValue::from_str("window missing"))?
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            on_timeout.unchecked_ref(),
            BANNER_TIMEOUT_MS,
        )?;

    Ok(())
}

// ============================================================================
// Animation loop
// ============================================================================

fn schedule_frame() {
    let handle = request_animation_frame(on_frame);
    with_state(|state| {
        state.borrow_mut().raf = Some(handle);
    });
}

fn on_frame(time_ms: f64) {
    let auto_changed = with_state(|state| {
        let mut s = state.borrow_mut();
        let dt = match s.last_frame_ms {
            Some(prev) => ((time_ms - prev) / 1000.0).clamp(0.0, 0.1),
            None => 1.0 / 60.0,
        };
        s.last_frame_ms = Some(time_ms);

        let auto_before = s.flags.auto_rotating;
        let s = &mut *s;
        s.flags.advance_frame(&mut s.showcase, &mut s.camera);
        s.camera.update(dt);
        auto_before != s.flags.auto_rotating
    });

    if auto_changed {
        refresh_auto_rotate_button();
    }

    render();
    schedule_frame();
}

fn render() {
    with_state(|state| {
        let s = state.borrow();
        let Some(gpu) = s.gpu.as_ref() else { return };
        let frame = FrameParams {
            view_proj: s.camera.view_proj_matrix(gpu_aspect(gpu)),
            view: s.camera.view_matrix(),
            model: s.showcase.model_matrix(),
            draw_model: s.showcase.has_model(),
            lights: s.lights,
            metallic: formats::METALLIC_OVERRIDE,
            roughness: formats::ROUGHNESS_OVERRIDE,
        };
        if let Err(err) = render_frame(gpu, &frame) {
            web_sys::console::warn_1(&err);
        }
    });
}

// ============================================================================
// Demo catalog
// ============================================================================

fn demo_record(
    name: &str,
    model_path: &str,
    scale: f64,
    specs: [&str; 5],
) -> PhoneRecord {
    PhoneRecord {
        name: name.to_string(),
        model_path: model_path.to_string(),
        scale,
        position: Coord3::new(0.0, -1.0, 0.0),
        rotation: Coord3::default(),
        specs: PhoneSpecs {
            screen_size: specs[0].to_string(),
            processor: specs[1].to_string(),
            camera: specs[2].to_string(),
            battery: specs[3].to_string(),
            storage: specs[4].to_string(),
        },
    }
}

/// Catalog baked into the standalone demo build.
fn demo_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.insert(
        "aurora-one",
        demo_record(
            "Aurora One",
            "models/aurora_one.glb",
            1.0,
            [
                "6.1\" OLED",
                "Octa-core 3.0 GHz",
                "48 MP dual",
                "4200 mAh",
                "128 GB",
            ],
        ),
    );
    catalog.insert(
        "aurora-pro",
        demo_record(
            "Aurora Pro",
            "models/aurora_pro.glb",
            1.2,
            [
                "6.7\" OLED 120 Hz",
                "Octa-core 3.4 GHz",
                "108 MP triple",
                "5000 mAh",
                "256 GB",
            ],
        ),
    );
    catalog.insert(
        "aurora-lite",
        demo_record(
            "Aurora Lite",
            "models/aurora_lite.glb",
            0.9,
            [
                "5.8\" LCD",
                "Hexa-core 2.4 GHz",
                "12 MP",
                "3600 mAh",
                "64 GB",
            ],
        ),
    );
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_catalog_is_ordered_and_complete() {
        let catalog = demo_catalog();
        let ids: Vec<&str> = catalog.ids().collect();
        assert_eq!(ids, vec!["aurora-one", "aurora-pro", "aurora-lite"]);
        assert_eq!(catalog.first_id(), Some("aurora-one"));
        for (_, record) in catalog.entries() {
            assert!(record.model_path.ends_with(".glb"));
            assert!(!record.specs.storage.is_empty());
        }
    }

    #[test]
    fn hold_controls_map_to_expected_element_ids() {
        assert_eq!(HoldControl::RotateLeft.element_id(), "rotate-left");
        assert_eq!(HoldControl::RotateRight.element_id(), "rotate-right");
        assert_eq!(HoldControl::ZoomIn.element_id(), "zoom-in");
        assert_eq!(HoldControl::ZoomOut.element_id(), "zoom-out");
    }
}
