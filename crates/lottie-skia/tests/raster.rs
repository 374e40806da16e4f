use lottie_core::Animation;
use lottie_skia::{encode_png, render_raster};
use serde_json::{json, Value};
use skia_safe::{Color, Image};

const RED_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAIAAAACCAYAAABytg0kAAAAEUlEQVR4nGP4z8DwH4QZYAwAR8oH+WdZbrcAAAAASUVORK5CYII=";

fn doc(width: u32, height: u32, layers: Value) -> Value {
    json!({ "v": "5.7.4", "w": width, "h": height, "fr": 30, "ip": 0, "op": 60, "layers": layers })
}

fn rect(center: Value, size: [f64; 2]) -> Value {
    json!({ "ty": "rc", "p": center, "s": { "a": 0, "k": size }, "r": { "a": 0, "k": 0 } })
}

fn red_fill() -> Value {
    json!({ "ty": "fl", "c": { "a": 0, "k": [1, 0, 0, 1] }, "o": { "a": 0, "k": 100 } })
}

fn shape_layer(shapes: Value) -> Value {
    json!({ "ty": 4, "ip": 0, "op": 60, "shapes": shapes })
}

fn moving_rect_doc() -> Value {
    let center = json!({ "a": 1, "k": [{ "t": 0, "s": [15, 50] }, { "t": 60, "s": [85, 50] }] });
    doc(100, 100, json!([shape_layer(json!([rect(center, [20.0, 20.0]), red_fill()]))]))
}

fn load(json: &Value) -> Animation {
    Animation::builder().from_value(json).unwrap()
}

fn pixel(image: &Image, x: i32, y: i32) -> Color {
    image.peek_pixels().unwrap().get_color((x, y))
}

fn pixels(image: &Image) -> Vec<u8> {
    image.peek_pixels().unwrap().bytes().unwrap().to_vec()
}

#[test]
fn test_fill_covers_its_geometry() {
    let json = doc(100, 100, json!([shape_layer(json!([rect(json!({ "a": 0, "k": [50, 50] }), [20.0, 20.0]), red_fill()]))]));
    let image = render_raster(&load(&json), 100, 100, Color::WHITE).unwrap();

    assert_eq!(pixel(&image, 50, 50), Color::RED);
    assert_eq!(pixel(&image, 5, 5), Color::WHITE);
    assert_eq!(pixel(&image, 45, 70), Color::WHITE);
}

#[test]
fn test_letterboxed_into_target() {
    let solid = json!({ "ty": 1, "ip": 0, "op": 60, "sw": 200, "sh": 100, "sc": "#0000ff" });
    let image = render_raster(&load(&doc(200, 100, json!([solid]))), 100, 100, Color::WHITE).unwrap();

    // 200x100 scaled by 0.5 and centered vertically: rows 25..75.
    assert_eq!(pixel(&image, 50, 10), Color::WHITE);
    assert_eq!(pixel(&image, 50, 50), Color::BLUE);
    assert_eq!(pixel(&image, 50, 90), Color::WHITE);
}

#[test]
fn test_rendering_is_idempotent() {
    let mut animation = load(&moving_rect_doc());
    animation.tick(700.0);
    let first = render_raster(&animation, 100, 100, Color::WHITE).unwrap();
    let second = render_raster(&animation, 100, 100, Color::WHITE).unwrap();
    assert_eq!(pixels(&first), pixels(&second));
}

#[test]
fn test_output_independent_of_seek_history() {
    let json = moving_rect_doc();
    let mut scrubbed = load(&json);
    for ms in [1500.0, 100.0, 900.0, 400.0] {
        scrubbed.tick(ms);
        let mut fresh = load(&json);
        fresh.tick(ms);
        let a = render_raster(&scrubbed, 100, 100, Color::WHITE).unwrap();
        let b = render_raster(&fresh, 100, 100, Color::WHITE).unwrap();
        assert_eq!(pixels(&a), pixels(&b), "at {ms}ms");
    }
}

#[test]
fn test_rect_moves_over_time() {
    let mut animation = load(&moving_rect_doc());
    animation.seek_frame(0.0);
    let start = render_raster(&animation, 100, 100, Color::WHITE).unwrap();
    assert_eq!(pixel(&start, 15, 50), Color::RED);
    assert_eq!(pixel(&start, 85, 50), Color::WHITE);

    animation.seek_frame(60.0);
    let end = render_raster(&animation, 100, 100, Color::WHITE).unwrap();
    assert_eq!(pixel(&end, 15, 50), Color::WHITE);
    assert_eq!(pixel(&end, 85, 50), Color::RED);
}

#[test]
fn test_intersect_merge_uses_path_ops() {
    let merge = json!({ "ty": "mm", "mm": 4 });
    let shapes = json!([
        rect(json!({ "a": 0, "k": [20, 20] }), [20.0, 20.0]),
        rect(json!({ "a": 0, "k": [30, 30] }), [20.0, 20.0]),
        merge,
        red_fill()
    ]);
    let image = render_raster(&load(&doc(100, 100, json!([shape_layer(shapes)]))), 100, 100, Color::WHITE).unwrap();

    assert_eq!(pixel(&image, 25, 25), Color::RED);
    assert_eq!(pixel(&image, 12, 12), Color::WHITE);
    assert_eq!(pixel(&image, 37, 37), Color::WHITE);
}

#[test]
fn test_track_matte_limits_content() {
    let matte = json!({
        "ty": 4, "ip": 0, "op": 60, "td": 1,
        "shapes": [rect(json!({ "a": 0, "k": [25, 50] }), [50.0, 100.0]), red_fill()]
    });
    let content = json!({ "ty": 1, "ip": 0, "op": 60, "tt": 1, "sw": 100, "sh": 100, "sc": "#00ff00" });
    let image = render_raster(&load(&doc(100, 100, json!([matte, content]))), 100, 100, Color::WHITE).unwrap();

    assert_eq!(pixel(&image, 20, 50), Color::GREEN);
    assert_eq!(pixel(&image, 80, 50), Color::WHITE);
}

#[test]
fn test_gradient_without_stops_paints_nothing() {
    let gradient = json!({
        "ty": "gf", "t": 1, "o": { "a": 0, "k": 100 },
        "s": { "a": 0, "k": [0, 50] }, "e": { "a": 0, "k": [100, 50] },
        "g": { "p": 0, "k": { "a": 0, "k": [] } }
    });
    let shapes = json!([rect(json!({ "a": 0, "k": [50, 50] }), [60.0, 60.0]), gradient]);
    let image = render_raster(&load(&doc(100, 100, json!([shape_layer(shapes)]))), 100, 100, Color::WHITE).unwrap();

    assert_eq!(pixel(&image, 50, 50), Color::WHITE);
}

#[test]
fn test_embedded_image_is_drawn() {
    let mut json = doc(2, 2, json!([{ "ty": 2, "refId": "image_0", "ip": 0, "op": 60 }]));
    json["assets"] = json!([{ "id": "image_0", "w": 2, "h": 2, "u": "", "p": format!("data:image/png;base64,{RED_PNG}") }]);
    let image = render_raster(&load(&json), 2, 2, Color::WHITE).unwrap();

    assert_eq!(pixel(&image, 0, 0), Color::RED);
    assert_eq!(pixel(&image, 1, 1), Color::RED);
}

#[test]
fn test_encode_png_signature() {
    let image = render_raster(&load(&moving_rect_doc()), 16, 16, Color::TRANSPARENT).unwrap();
    let png = encode_png(&image).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}
