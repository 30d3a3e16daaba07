//! # Drag-and-Drop Reconciler
//!
//! Turns a drag gesture into at most one [`Mutation`].
//!
//! ## Gesture lifecycle
//!
//! ```text
//! Idle ──begin──▶ Pending ──pointer moved ≥ activation distance──▶ Dragging
//!   ▲                │                                               │
//!   └────────────── end / cancel ◀───────────────────────────────────┘
//! ```
//!
//! A drag started without a pointer origin (keyboard sensor) is active
//! immediately. Ending a drag that never activated is a click and produces
//! nothing.
//!
//! ## Collision detection
//!
//! Layered, first non-empty layer wins:
//! 1. **Pointer within**: droppables containing the pointer, nearest corners first.
//!    Precise when a small block sits inside a larger droppable container.
//! 2. **Rect intersection**: overlap ratio between the dragged rect and each
//!    droppable, largest first.
//! 3. **Closest center**: every droppable by center distance, so something is
//!    always hit while any droppable exists.
//!
//! ## Drop resolution
//!
//! | Source         | Target                 | Result                          |
//! |----------------|------------------------|---------------------------------|
//! | new block      | canvas end             | `Insert` (append)               |
//! | new block      | block at root index k  | `Insert` at k (append if nested)|
//! | existing block | another block          | `Reorder`                       |
//! | anything       | nothing                | no mutation                     |

use crate::block::{Block, BlockType};
use crate::mutations::{root_index, Mutation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Droppable id of the region at the end of the canvas
pub const CANVAS_DROPPABLE_ID: &str = "canvas-droppable";

/// Pointer travel (px) before a pointer drag activates
pub const DEFAULT_ACTIVATION_DISTANCE: f64 = 8.0;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned rectangle in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.right(), self.y),
            Point::new(self.x, self.bottom()),
            Point::new(self.right(), self.bottom()),
        ]
    }

    /// Inclusive containment
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Area of the overlap with `other` (0 when disjoint)
    pub fn intersection_area(&self, other: &Rect) -> f64 {
        let width = self.right().min(other.right()) - self.x.max(other.x);
        let height = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if width <= 0.0 || height <= 0.0 {
            0.0
        } else {
            width * height
        }
    }
}

// ---------------------------------------------------------------------------
// Sources and targets
// ---------------------------------------------------------------------------

/// What is being dragged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DragSource {
    /// A block type dragged out of the palette
    NewBlock { block_type: BlockType },

    /// A block already on the canvas
    ExistingBlock { id: String },
}

impl DragSource {
    /// Label shown in the drag overlay
    pub fn overlay_label(&self) -> String {
        match self {
            DragSource::NewBlock { block_type } => format!("New {block_type} block"),
            DragSource::ExistingBlock { .. } => "Moving block...".to_string(),
        }
    }
}

/// Where a drag can land
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropTarget {
    /// Region after the last root block
    CanvasEnd,

    /// A specific block
    Block(String),
}

impl DropTarget {
    pub fn from_droppable_id(id: &str) -> Self {
        if id == CANVAS_DROPPABLE_ID {
            DropTarget::CanvasEnd
        } else {
            DropTarget::Block(id.to_string())
        }
    }

    pub fn droppable_id(&self) -> &str {
        match self {
            DropTarget::CanvasEnd => CANVAS_DROPPABLE_ID,
            DropTarget::Block(id) => id,
        }
    }
}

/// A region that accepts drops
#[derive(Debug, Clone, PartialEq)]
pub struct Droppable {
    pub target: DropTarget,
    pub rect: Rect,
}

impl Droppable {
    pub fn new(target: DropTarget, rect: Rect) -> Self {
        Self { target, rect }
    }
}

/// A droppable hit by collision detection; lower `score` ranks first for
/// distance-based layers, higher for the intersection layer
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub target: DropTarget,
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Collision detection
// ---------------------------------------------------------------------------

/// Droppables containing the pointer, sorted by mean distance from the pointer
/// to their corners (smaller, tighter regions first)
pub fn pointer_within(droppables: &[Droppable], pointer: Option<Point>) -> Vec<Collision> {
    let Some(pointer) = pointer else {
        return Vec::new();
    };

    let mut hits: Vec<Collision> = droppables
        .iter()
        .filter(|d| d.rect.contains(&pointer))
        .map(|d| {
            let total: f64 = d.rect.corners().iter().map(|c| c.distance(&pointer)).sum();
            Collision {
                target: d.target.clone(),
                score: total / 4.0,
            }
        })
        .collect();
    hits.sort_by(|a, b| a.score.total_cmp(&b.score));
    hits
}

/// Droppables overlapping the dragged rect, by intersection-over-union, largest first
pub fn rect_intersection(droppables: &[Droppable], active: Rect) -> Vec<Collision> {
    let mut hits: Vec<Collision> = droppables
        .iter()
        .filter_map(|d| {
            let overlap = d.rect.intersection_area(&active);
            if overlap <= 0.0 {
                return None;
            }
            let union = d.rect.area() + active.area() - overlap;
            Some(Collision {
                target: d.target.clone(),
                score: overlap / union,
            })
        })
        .collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits
}

/// Every droppable, by distance between its center and the dragged rect's center
pub fn closest_center(droppables: &[Droppable], active: Rect) -> Vec<Collision> {
    let center = active.center();
    let mut hits: Vec<Collision> = droppables
        .iter()
        .map(|d| Collision {
            target: d.target.clone(),
            score: d.rect.center().distance(&center),
        })
        .collect();
    hits.sort_by(|a, b| a.score.total_cmp(&b.score));
    hits
}

/// Layered detection: pointer-within, then rect-intersection, then closest-center
pub fn detect_collisions(
    droppables: &[Droppable],
    active: Rect,
    pointer: Option<Point>,
) -> Vec<Collision> {
    let hits = pointer_within(droppables, pointer);
    if !hits.is_empty() {
        return hits;
    }

    let hits = rect_intersection(droppables, active);
    if !hits.is_empty() {
        return hits;
    }

    closest_center(droppables, active)
}

// ---------------------------------------------------------------------------
// Drop resolution
// ---------------------------------------------------------------------------

/// Decide which mutation a drop produces
pub fn resolve_drop(
    source: &DragSource,
    over: Option<&DropTarget>,
    blocks: &[Block],
) -> Option<Mutation> {
    let over = over?;

    match (source, over) {
        (DragSource::NewBlock { block_type }, DropTarget::CanvasEnd) => Some(Mutation::Insert {
            block_type: *block_type,
            position: None,
        }),

        // Insert before the target; nested targets fall back to append
        (DragSource::NewBlock { block_type }, DropTarget::Block(over_id)) => {
            Some(Mutation::Insert {
                block_type: *block_type,
                position: root_index(blocks, over_id),
            })
        }

        (DragSource::ExistingBlock { id }, DropTarget::Block(over_id)) if id != over_id => {
            Some(Mutation::Reorder {
                active_id: id.clone(),
                over_id: over_id.clone(),
            })
        }

        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Gesture state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,

    /// Pointer is down but has not travelled the activation distance yet
    Pending { source: DragSource, origin: Point },

    Dragging { source: DragSource },
}

/// Tracks one drag gesture at a time
#[derive(Debug, Clone)]
pub struct Reconciler {
    state: DragState,
    activation_distance: f64,
}

impl Reconciler {
    pub fn new(activation_distance: f64) -> Self {
        Self {
            state: DragState::Idle,
            activation_distance: activation_distance.max(0.0),
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Source of the active drag, once activated
    pub fn active(&self) -> Option<&DragSource> {
        match &self.state {
            DragState::Dragging { source } => Some(source),
            _ => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Overlay text for the active drag
    pub fn overlay_label(&self) -> Option<String> {
        self.active().map(DragSource::overlay_label)
    }

    /// Start a gesture. Without a pointer origin the drag is active at once.
    pub fn begin(&mut self, source: DragSource, origin: Option<Point>) {
        self.state = match origin {
            Some(origin) if self.activation_distance > 0.0 => DragState::Pending { source, origin },
            _ => DragState::Dragging { source },
        };
        debug!(state = ?self.state, "Drag started");
    }

    /// Feed pointer movement; activates a pending drag once it travels far enough
    pub fn pointer_moved(&mut self, pointer: Point) {
        if let DragState::Pending { source, origin } = &self.state {
            if origin.distance(&pointer) >= self.activation_distance {
                self.state = DragState::Dragging {
                    source: source.clone(),
                };
                debug!("Drag activated");
            }
        }
    }

    /// Finish the gesture over `over`; returns the mutation to apply, if any
    pub fn end(&mut self, over: Option<&DropTarget>, blocks: &[Block]) -> Option<Mutation> {
        let state = std::mem::take(&mut self.state);
        let DragState::Dragging { source } = state else {
            return None;
        };

        let mutation = resolve_drop(&source, over, blocks);
        debug!(?source, ?over, ?mutation, "Drag ended");
        mutation
    }

    /// Finish the gesture, resolving the target by collision detection
    pub fn end_at(
        &mut self,
        droppables: &[Droppable],
        active: Rect,
        pointer: Option<Point>,
        blocks: &[Block],
    ) -> Option<Mutation> {
        let over = detect_collisions(droppables, active, pointer)
            .into_iter()
            .next()
            .map(|c| c.target);
        self.end(over.as_ref(), blocks)
    }

    /// Abort the gesture without side effects
    pub fn cancel(&mut self) {
        if self.state != DragState::Idle {
            debug!("Drag cancelled");
        }
        self.state = DragState::Idle;
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVATION_DISTANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks() -> Vec<Block> {
        vec![
            Block::new_default("b0", BlockType::Paragraph),
            Block::new_default("b1", BlockType::Section)
                .with_child(Block::new_default("inner", BlockType::Paragraph)),
            Block::new_default("b2", BlockType::Image),
        ]
    }

    fn new_block(block_type: BlockType) -> DragSource {
        DragSource::NewBlock { block_type }
    }

    fn existing(id: &str) -> DragSource {
        DragSource::ExistingBlock { id: id.to_string() }
    }

    fn target(id: &str) -> DropTarget {
        DropTarget::Block(id.to_string())
    }

    #[test]
    fn test_droppable_ids() {
        assert_eq!(DropTarget::from_droppable_id("canvas-droppable"), DropTarget::CanvasEnd);
        assert_eq!(DropTarget::from_droppable_id("b1"), target("b1"));
        assert_eq!(DropTarget::CanvasEnd.droppable_id(), "canvas-droppable");
    }

    #[test]
    fn test_new_block_on_canvas_appends() {
        let mutation = resolve_drop(&new_block(BlockType::Quote), Some(&DropTarget::CanvasEnd), &blocks());
        assert_eq!(
            mutation,
            Some(Mutation::Insert {
                block_type: BlockType::Quote,
                position: None
            })
        );
    }

    #[test]
    fn test_new_block_on_block_inserts_before() {
        let mutation = resolve_drop(&new_block(BlockType::Code), Some(&target("b2")), &blocks());
        assert_eq!(
            mutation,
            Some(Mutation::Insert {
                block_type: BlockType::Code,
                position: Some(2)
            })
        );

        // Nested target has no root index
        let mutation = resolve_drop(&new_block(BlockType::Code), Some(&target("inner")), &blocks());
        assert_eq!(
            mutation,
            Some(Mutation::Insert {
                block_type: BlockType::Code,
                position: None
            })
        );
    }

    #[test]
    fn test_existing_block_reorders() {
        let mutation = resolve_drop(&existing("b2"), Some(&target("b0")), &blocks());
        assert_eq!(
            mutation,
            Some(Mutation::Reorder {
                active_id: "b2".to_string(),
                over_id: "b0".to_string()
            })
        );

        assert_eq!(resolve_drop(&existing("b2"), Some(&target("b2")), &blocks()), None);
        assert_eq!(resolve_drop(&existing("b2"), Some(&DropTarget::CanvasEnd), &blocks()), None);
        assert_eq!(resolve_drop(&existing("b2"), None, &blocks()), None);
    }

    #[test]
    fn test_pointer_within_prefers_nested_block() {
        let droppables = vec![
            Droppable::new(DropTarget::CanvasEnd, Rect::new(0.0, 0.0, 800.0, 600.0)),
            Droppable::new(target("b1"), Rect::new(100.0, 100.0, 200.0, 40.0)),
        ];
        let hits = pointer_within(&droppables, Some(Point::new(150.0, 120.0)));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].target, target("b1"));

        assert!(pointer_within(&droppables, None).is_empty());
    }

    #[test]
    fn test_layers_fall_through() {
        let droppables = vec![
            Droppable::new(target("a"), Rect::new(0.0, 0.0, 100.0, 100.0)),
            Droppable::new(target("b"), Rect::new(0.0, 200.0, 100.0, 100.0)),
        ];

        // Pointer outside everything, dragged rect overlaps "b"
        let active = Rect::new(0.0, 150.0, 100.0, 100.0);
        let hits = detect_collisions(&droppables, active, Some(Point::new(500.0, 500.0)));
        assert_eq!(hits[0].target, target("b"));

        // No overlap at all: nearest center wins
        let active = Rect::new(0.0, 110.0, 100.0, 10.0);
        let hits = detect_collisions(&droppables, active, None);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].target, target("a"));

        assert!(detect_collisions(&[], active, None).is_empty());
    }

    #[test]
    fn test_activation_distance() {
        let mut reconciler = Reconciler::new(8.0);
        reconciler.begin(existing("b0"), Some(Point::new(0.0, 0.0)));
        assert!(!reconciler.is_dragging());

        reconciler.pointer_moved(Point::new(3.0, 4.0));
        assert!(!reconciler.is_dragging());

        // Released before activation: treated as a click
        assert_eq!(reconciler.end(Some(&target("b2")), &blocks()), None);
        assert_eq!(reconciler.state(), &DragState::Idle);

        reconciler.begin(existing("b0"), Some(Point::new(0.0, 0.0)));
        reconciler.pointer_moved(Point::new(6.0, 8.0));
        assert!(reconciler.is_dragging());
        assert_eq!(reconciler.overlay_label().as_deref(), Some("Moving block..."));
    }

    #[test]
    fn test_keyboard_drag_is_active_immediately() {
        let mut reconciler = Reconciler::default();
        reconciler.begin(new_block(BlockType::Video), None);
        assert_eq!(reconciler.overlay_label().as_deref(), Some("New video block"));

        let mutation = reconciler.end(Some(&DropTarget::CanvasEnd), &blocks());
        assert!(matches!(mutation, Some(Mutation::Insert { .. })));
        assert_eq!(reconciler.state(), &DragState::Idle);
    }

    #[test]
    fn test_cancel_resets() {
        let mut reconciler = Reconciler::default();
        reconciler.begin(new_block(BlockType::Video), None);
        reconciler.cancel();
        assert_eq!(reconciler.state(), &DragState::Idle);
        assert_eq!(reconciler.end(Some(&DropTarget::CanvasEnd), &blocks()), None);
    }

    #[test]
    fn test_end_at_uses_collision_detection() {
        let mut reconciler = Reconciler::new(0.0);
        reconciler.begin(new_block(BlockType::Divider), Some(Point::new(0.0, 0.0)));
        assert!(reconciler.is_dragging());

        let droppables = vec![
            Droppable::new(DropTarget::CanvasEnd, Rect::new(0.0, 0.0, 800.0, 600.0)),
            Droppable::new(target("b0"), Rect::new(0.0, 0.0, 800.0, 50.0)),
        ];
        let mutation = reconciler.end_at(
            &droppables,
            Rect::new(10.0, 10.0, 100.0, 20.0),
            Some(Point::new(20.0, 20.0)),
            &blocks(),
        );
        assert_eq!(
            mutation,
            Some(Mutation::Insert {
                block_type: BlockType::Divider,
                position: Some(0)
            })
        );
    }
}
