//! Items instantiated from `.tsn` documents.
//!
//! ```text
//! Scene { width: 400  height: 240  background: #101820
//!     Rect   { x: 0  y: 0  width: 100%  height: 40  color: #1e2a38 }
//!     Toggle { x: 16  y: 60  width: 46  height: 24  on: #1bb36c  off: #334155 }
//!     Pulse  { x: 50%  y: 50%  width: 40  height: 40  from: #ff0000  to: #0000ff  period: 2 }
//! }
//! ```

use tandem_engine::coords::{Rect, Size};
use tandem_engine::draw::{DrawList, ZIndex};
use tandem_engine::input::{MouseButton, PointerKind};
use tandem_engine::paint::Color;
use tandem_engine::time::FrameTime;
use tandem_scene::{Document, Node, Value};

use super::{Diagnostic, EventResult, SceneEvent, SceneItem, SceneObject};

/// Kind of a non-drawable root object.
const PLAIN_OBJECT: &str = "Object";

// ── Building ──────────────────────────────────────────────────────────────

/// Instantiates `doc`. Every problem found is reported, not just the first.
pub(crate) fn build(doc: &Document, source: &str) -> Result<SceneObject, Vec<Diagnostic>> {
    let mut b = Builder { source, diagnostics: Vec::new() };
    let root = &doc.root;

    let object = match root.kind.as_str() {
        "Scene" => b.scene(root).map(|s| SceneObject::Item(Box::new(s))),
        PLAIN_OBJECT => {
            b.no_children(root);
            Some(SceneObject::Plain { type_name: root.kind.clone() })
        }
        "Rect" | "Toggle" | "Pulse" => {
            b.error(root, format!("`{}` must be placed inside a `Scene`", root.kind));
            None
        }
        other => {
            b.error(root, format!("unknown type `{other}`"));
            None
        }
    };

    match object {
        Some(object) if b.diagnostics.is_empty() => Ok(object),
        _ => Err(b.diagnostics),
    }
}

struct Builder<'a> {
    source: &'a str,
    diagnostics: Vec<Diagnostic>,
}

impl Builder<'_> {
    fn error(&mut self, at: &Node, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::at(self.source, at.line, at.col, message));
    }

    fn scene(&mut self, node: &Node) -> Option<SceneRoot> {
        let mut root = SceneRoot::default();
        for prop in &node.props {
            match prop.key.as_str() {
                "width" => root.implicit.width = self.number(node, &prop.key, &prop.value).unwrap_or(0.0),
                "height" => root.implicit.height = self.number(node, &prop.key, &prop.value).unwrap_or(0.0),
                "background" => root.background = self.color(node, &prop.key, &prop.value),
                key => self.error(node, format!("`Scene` has no property `{key}`")),
            }
        }

        for child in &node.children {
            if let Some(c) = self.child(child) {
                root.children.push(c);
            }
        }
        Some(root)
    }

    fn child(&mut self, node: &Node) -> Option<Child> {
        let mut kind = match node.kind.as_str() {
            "Rect" => ChildKind::Rect { color: Color::WHITE },
            "Toggle" => ChildKind::Toggle {
                on: Color::from_rgba8([0x1b, 0xb3, 0x6c, 0xff]),
                off: Color::from_rgba8([0x33, 0x41, 0x55, 0xff]),
                checked: false,
            },
            "Pulse" => ChildKind::Pulse {
                from: Color::BLACK,
                to: Color::WHITE,
                period: 1.0,
                phase: 0.0,
            },
            other => {
                self.error(node, format!("unknown type `{other}`"));
                return None;
            }
        };
        self.no_children(node);

        let mut child = Child { frame: Frame::default(), z: ZIndex(0), kind: ChildKind::Rect { color: Color::WHITE } };
        for prop in &node.props {
            let (key, value) = (prop.key.as_str(), &prop.value);
            match (key, &mut kind) {
                ("x", _) => child.frame.x = self.length(node, key, value),
                ("y", _) => child.frame.y = self.length(node, key, value),
                ("width", _) => child.frame.width = self.length(node, key, value),
                ("height", _) => child.frame.height = self.length(node, key, value),
                ("z", _) => child.z = ZIndex(self.number(node, key, value).unwrap_or(0.0) as i32),
                ("color", ChildKind::Rect { color }) => {
                    *color = self.color(node, key, value).unwrap_or(*color)
                }
                ("on", ChildKind::Toggle { on, .. }) => *on = self.color(node, key, value).unwrap_or(*on),
                ("off", ChildKind::Toggle { off, .. }) => *off = self.color(node, key, value).unwrap_or(*off),
                ("checked", ChildKind::Toggle { checked, .. }) => {
                    *checked = self.flag(node, key, value).unwrap_or(*checked)
                }
                ("from", ChildKind::Pulse { from, .. }) => *from = self.color(node, key, value).unwrap_or(*from),
                ("to", ChildKind::Pulse { to, .. }) => *to = self.color(node, key, value).unwrap_or(*to),
                ("period", ChildKind::Pulse { period, .. }) => match self.number(node, key, value) {
                    Some(p) if p > 0.0 => *period = p,
                    Some(_) => self.error(node, "`period` must be positive"),
                    None => {}
                },
                _ => self.error(node, format!("`{}` has no property `{key}`", node.kind)),
            }
        }
        child.kind = kind;
        Some(child)
    }

    fn no_children(&mut self, node: &Node) {
        if let Some(first) = node.children.first() {
            self.error(first, format!("`{}` cannot have children", node.kind));
        }
    }

    fn mismatch(&mut self, node: &Node, key: &str, expected: &str, got: &Value) {
        self.error(node, format!("`{key}` expects a {expected}, found a {}", got.type_name()));
    }

    fn number(&mut self, node: &Node, key: &str, value: &Value) -> Option<f32> {
        let n = value.as_number();
        if n.is_none() {
            self.mismatch(node, key, "number", value);
        }
        n
    }

    fn color(&mut self, node: &Node, key: &str, value: &Value) -> Option<Color> {
        match value.as_color() {
            Some(rgba) => Some(Color::from_rgba8(rgba)),
            None => {
                self.mismatch(node, key, "color", value);
                None
            }
        }
    }

    fn length(&mut self, node: &Node, key: &str, value: &Value) -> Length {
        match value {
            Value::Number(n) => Length::Px(*n),
            Value::Percent(p) => Length::Percent(*p),
            other => {
                self.mismatch(node, key, "length", other);
                Length::Px(0.0)
            }
        }
    }

    fn flag(&mut self, node: &Node, key: &str, value: &Value) -> Option<bool> {
        match value {
            Value::Ident(s) if s == "true" => Some(true),
            Value::Ident(s) if s == "false" => Some(false),
            other => {
                self.mismatch(node, key, "`true` or `false`", other);
                None
            }
        }
    }
}

// ── Items ─────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq)]
enum Length {
    Px(f32),
    /// Percentage of the root's size along the same axis.
    Percent(f32),
}

impl Length {
    fn resolve(self, total: f32) -> f32 {
        match self {
            Length::Px(v) => v,
            Length::Percent(p) => total * p / 100.0,
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Frame {
    x: Length,
    y: Length,
    width: Length,
    height: Length,
}

impl Default for Frame {
    fn default() -> Self {
        Self { x: Length::Px(0.0), y: Length::Px(0.0), width: Length::Px(0.0), height: Length::Px(0.0) }
    }
}

impl Frame {
    fn resolve(&self, parent: Size) -> Rect {
        Rect::new(
            self.x.resolve(parent.width),
            self.y.resolve(parent.height),
            self.width.resolve(parent.width),
            self.height.resolve(parent.height),
        )
    }
}

#[derive(Debug, Clone)]
enum ChildKind {
    Rect { color: Color },
    /// Flips between two colors on press.
    Toggle { on: Color, off: Color, checked: bool },
    /// Triangle-wave blend between two colors; `phase` is in [0, 1).
    Pulse { from: Color, to: Color, period: f32, phase: f32 },
}

#[derive(Debug, Clone)]
struct Child {
    frame: Frame,
    z: ZIndex,
    kind: ChildKind,
}

impl Child {
    fn color(&self) -> Color {
        match &self.kind {
            ChildKind::Rect { color } => *color,
            ChildKind::Toggle { on, off, checked } => if *checked { *on } else { *off },
            ChildKind::Pulse { from, to, phase, .. } => from.lerp(*to, 1.0 - (2.0 * phase - 1.0).abs()),
        }
    }
}

/// Root of a `Scene` document.
#[derive(Debug, Clone, Default)]
pub(crate) struct SceneRoot {
    implicit: Size,
    size: Size,
    background: Option<Color>,
    children: Vec<Child>,
}

impl SceneItem for SceneRoot {
    fn implicit_size(&self) -> Size {
        self.implicit
    }

    fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    fn size(&self) -> Size {
        self.size
    }

    fn polish(&mut self, time: FrameTime) {
        for child in &mut self.children {
            if let ChildKind::Pulse { period, phase, .. } = &mut child.kind {
                *phase = (*phase + time.dt / *period).fract();
            }
        }
    }

    fn record(&self, list: &mut DrawList) {
        if let Some(bg) = self.background {
            list.push_rect(ZIndex(i32::MIN), Rect::new(0.0, 0.0, self.size.width, self.size.height), bg);
        }
        for child in &self.children {
            list.push_rect(child.z, child.frame.resolve(self.size), child.color());
        }
    }

    fn handle_input(&mut self, event: &SceneEvent) -> EventResult {
        let SceneEvent::Pointer(ev) = event else {
            return EventResult::Ignored;
        };
        if ev.kind != PointerKind::Press || ev.button != Some(MouseButton::Left) {
            return EventResult::Ignored;
        }

        // Topmost first: highest z, later siblings above earlier ones.
        let size = self.size;
        let hit = self
            .children
            .iter_mut()
            .enumerate()
            .filter(|(_, c)| c.frame.resolve(size).contains(ev.position))
            .max_by_key(|(i, c)| (c.z, *i))
            .map(|(_, c)| c);

        match hit {
            Some(Child { kind: ChildKind::Toggle { checked, .. }, .. }) => {
                *checked = !*checked;
                log::debug!("toggle switched {}", if *checked { "on" } else { "off" });
                EventResult::Consumed
            }
            _ => EventResult::Ignored,
        }
    }

    fn needs_update(&self) -> bool {
        self.children.iter().any(|c| matches!(c.kind, ChildKind::Pulse { .. }))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use tandem_engine::coords::Vec2;
    use tandem_engine::draw::DrawCmd;
    use tandem_engine::input::{Buttons, Modifiers, PointerEvent};
    use tandem_scene::parse_str;

    use super::*;

    fn build_src(src: &str) -> Result<SceneObject, Vec<Diagnostic>> {
        build(&parse_str(src).unwrap(), "test.tsn")
    }

    fn root(src: &str) -> Box<dyn SceneItem> {
        match build_src(src).unwrap() {
            SceneObject::Item(item) => item,
            other => panic!("expected an item, got {other:?}"),
        }
    }

    fn rects(item: &dyn SceneItem) -> Vec<(Rect, [u8; 4])> {
        let mut list = DrawList::new();
        item.record(&mut list);
        list.items()
            .iter()
            .map(|i| {
                let DrawCmd::Rect(r) = &i.cmd;
                (r.rect, r.color.to_rgba8())
            })
            .collect()
    }

    fn press(x: f32, y: f32) -> SceneEvent {
        SceneEvent::Pointer(PointerEvent {
            kind: PointerKind::Press,
            position: Vec2::new(x, y),
            global: Vec2::new(x, y),
            button: Some(MouseButton::Left),
            buttons: Buttons::NONE.with(MouseButton::Left),
            modifiers: Modifiers::default(),
        })
    }

    #[test]
    fn percentages_follow_root_size() {
        let mut item = root("Scene { Rect { x: 50% y: 0 width: 50% height: 100% color: #ff0000 } }");
        assert_eq!(item.implicit_size(), Size::zero());
        item.set_size(Size::new(200.0, 100.0));
        assert_eq!(rects(item.as_ref()), vec![(Rect::new(100.0, 0.0, 100.0, 100.0), [255, 0, 0, 255])]);
    }

    #[test]
    fn background_fills_root() {
        let mut item = root("Scene { width: 40 height: 30 background: #102030 }");
        assert_eq!(item.implicit_size(), Size::new(40.0, 30.0));
        item.set_size(Size::new(8.0, 4.0));
        assert_eq!(rects(item.as_ref())[0].0, Rect::new(0.0, 0.0, 8.0, 4.0));
    }

    #[test]
    fn toggle_flips_on_press_inside() {
        let mut item = root("Scene { Toggle { x: 10 y: 10 width: 20 height: 10 on: #00ff00 off: #ff0000 } }");
        item.set_size(Size::new(100.0, 100.0));
        assert_eq!(item.handle_input(&press(50.0, 50.0)), EventResult::Ignored);
        assert_eq!(rects(item.as_ref())[0].1, [255, 0, 0, 255]);
        assert_eq!(item.handle_input(&press(15.0, 12.0)), EventResult::Consumed);
        assert_eq!(rects(item.as_ref())[0].1, [0, 255, 0, 255]);
    }

    #[test]
    fn rect_above_toggle_swallows_hit() {
        let mut item = root(
            "Scene { Toggle { width: 10 height: 10 } Rect { width: 10 height: 10 z: 1 } }",
        );
        item.set_size(Size::new(10.0, 10.0));
        assert_eq!(item.handle_input(&press(5.0, 5.0)), EventResult::Ignored);
    }

    #[test]
    fn pulse_animates() {
        let mut item = root("Scene { Pulse { width: 1 height: 1 from: #000000 to: #ffffff period: 2 } }");
        item.set_size(Size::new(1.0, 1.0));
        assert!(item.needs_update());
        let before = rects(item.as_ref())[0].1;
        item.polish(FrameTime { dt: 1.0, now: Instant::now(), frame_index: 0 });
        let after = rects(item.as_ref())[0].1;
        assert_eq!(before, [0, 0, 0, 255]);
        assert_eq!(after, [255, 255, 255, 255]);
    }

    #[test]
    fn plain_object_root() {
        assert!(matches!(build_src("Object"), Ok(SceneObject::Plain { type_name }) if type_name == "Object"));
    }

    #[test]
    fn every_problem_is_reported() {
        let diags = build_src(
            "Scene {\n  Rect { color: 12 }\n  Blob\n  Pulse { period: 0 speed: 1 }\n}",
        )
        .unwrap_err();
        assert_eq!(diags.len(), 4);
        assert_eq!(diags[0].location, "test.tsn:2:3");
        assert!(diags[0].message.contains("expects a color"));
        assert!(diags[1].message.contains("unknown type `Blob`"));
        assert!(diags[2].message.contains("positive"));
        assert!(diags[3].message.contains("no property `speed`"));
    }

    #[test]
    fn leaf_kinds_cannot_be_roots_or_parents() {
        let diags = build_src("Rect").unwrap_err();
        assert!(diags[0].message.contains("inside a `Scene`"));
        let diags = build_src("Scene { Rect { Rect } }").unwrap_err();
        assert!(diags[0].message.contains("cannot have children"));
    }
}
