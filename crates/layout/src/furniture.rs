//! Venue domain model: rooms, furniture and layouts.

use crate::geometry::{polygon_area, Obb};
use venue_core::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of a furniture item.
///
/// The kind decides how an item participates in every energy term, so the
/// evaluator and the neighbor generator match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FurnitureKind {
    /// Single seat.
    Chair,
    /// Round dining table.
    RoundTable,
    /// Rectangular table.
    RectTable,
    /// Raised stage.
    Stage,
    /// Bar counter.
    Bar,
    /// Dance floor.
    DanceFloor,
    /// Speaker podium.
    Podium,
    /// Audio/visual control booth.
    AvBooth,
    /// Catering service station.
    ServiceStation,
}

/// How a kind is treated by the aisle clearance rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AisleRole {
    /// Seating; seats may touch each other.
    Seat,
    /// Tables with chairs pulled up to them.
    Table,
    /// Bars and service points that need a wide service aisle.
    Service,
    /// Fixed features guests walk around.
    Fixture,
}

impl FurnitureKind {
    /// All kinds, in declaration order.
    pub const ALL: [FurnitureKind; 9] = [
        FurnitureKind::Chair,
        FurnitureKind::RoundTable,
        FurnitureKind::RectTable,
        FurnitureKind::Stage,
        FurnitureKind::Bar,
        FurnitureKind::DanceFloor,
        FurnitureKind::Podium,
        FurnitureKind::AvBooth,
        FurnitureKind::ServiceStation,
    ];

    /// Aisle role of the kind.
    pub fn aisle_role(self) -> AisleRole {
        match self {
            FurnitureKind::Chair => AisleRole::Seat,
            FurnitureKind::RoundTable | FurnitureKind::RectTable => AisleRole::Table,
            FurnitureKind::Bar | FurnitureKind::ServiceStation => AisleRole::Service,
            FurnitureKind::Stage
            | FurnitureKind::DanceFloor
            | FurnitureKind::Podium
            | FurnitureKind::AvBooth => AisleRole::Fixture,
        }
    }

    /// Returns true for dining/work tables.
    pub fn is_table(self) -> bool {
        self.aisle_role() == AisleRole::Table
    }

    /// Returns true for items that demand a wide service aisle.
    pub fn is_service(self) -> bool {
        self.aisle_role() == AisleRole::Service
    }

    /// Returns true for items that block walking paths.
    ///
    /// Chairs are pushed aside by people and never block.
    pub fn blocks_paths(self) -> bool {
        !matches!(self, FurnitureKind::Chair)
    }

    /// Returns true for items that can serve as the room's focal point.
    pub fn is_focal(self) -> bool {
        matches!(self, FurnitureKind::Stage | FurnitureKind::Podium)
    }

    /// Nominal footprint `(width, depth)` in feet.
    pub fn default_dimensions(self) -> (f64, f64) {
        match self {
            FurnitureKind::Chair => (1.5, 1.5),
            FurnitureKind::RoundTable => (5.0, 5.0),
            FurnitureKind::RectTable => (6.0, 2.5),
            FurnitureKind::Stage => (16.0, 8.0),
            FurnitureKind::Bar => (8.0, 2.5),
            FurnitureKind::DanceFloor => (15.0, 15.0),
            FurnitureKind::Podium => (2.0, 2.0),
            FurnitureKind::AvBooth => (6.0, 4.0),
            FurnitureKind::ServiceStation => (6.0, 3.0),
        }
    }

    /// Short lowercase label.
    pub fn label(self) -> &'static str {
        match self {
            FurnitureKind::Chair => "chair",
            FurnitureKind::RoundTable => "round_table",
            FurnitureKind::RectTable => "rect_table",
            FurnitureKind::Stage => "stage",
            FurnitureKind::Bar => "bar",
            FurnitureKind::DanceFloor => "dance_floor",
            FurnitureKind::Podium => "podium",
            FurnitureKind::AvBooth => "av_booth",
            FurnitureKind::ServiceStation => "service_station",
        }
    }
}

/// A placed furniture item.
///
/// `(x, y)` is the center, `rotation` is in radians, `width` runs along the
/// item's local x axis and `depth` along its local y axis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FurnitureItem {
    /// Item kind.
    pub kind: FurnitureKind,
    /// Center x.
    pub x: f64,
    /// Center y.
    pub y: f64,
    /// Rotation in radians.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rotation: f64,
    /// Extent along the local x axis.
    pub width: f64,
    /// Extent along the local y axis.
    pub depth: f64,
    /// Guests seated by this item.
    #[cfg_attr(feature = "serde", serde(default))]
    pub seats: u32,
}

impl FurnitureItem {
    /// Creates an item with explicit dimensions and no seats.
    pub fn new(kind: FurnitureKind, x: f64, y: f64, width: f64, depth: f64) -> Self {
        Self {
            kind,
            x,
            y,
            rotation: 0.0,
            width,
            depth,
            seats: 0,
        }
    }

    /// Creates an item with the kind's nominal dimensions.
    ///
    /// Chairs seat one guest; everything else seats nobody.
    pub fn of_kind(kind: FurnitureKind, x: f64, y: f64) -> Self {
        let (w, d) = kind.default_dimensions();
        let item = Self::new(kind, x, y, w, d);
        if kind == FurnitureKind::Chair {
            item.with_seats(1)
        } else {
            item
        }
    }

    /// Sets the rotation.
    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets the seat count.
    pub fn with_seats(mut self, seats: u32) -> Self {
        self.seats = seats;
        self
    }

    /// Oriented bounding box of the footprint.
    pub fn obb(&self) -> Obb {
        Obb::new(self.x, self.y, self.width, self.depth, self.rotation)
    }

    /// Footprint area.
    pub fn area(&self) -> f64 {
        self.width * self.depth
    }

    /// Checks dimensions and coordinates.
    pub fn validate(&self, index: usize) -> Result<()> {
        let reason = if !(self.width > 0.0 && self.width.is_finite()) {
            Some("width must be positive and finite")
        } else if !(self.depth > 0.0 && self.depth.is_finite()) {
            Some("depth must be positive and finite")
        } else if !(self.x.is_finite() && self.y.is_finite() && self.rotation.is_finite()) {
            Some("position and rotation must be finite")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(Error::InvalidFurniture {
                index,
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// A doorway usable for egress.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Exit {
    /// Center x.
    pub x: f64,
    /// Center y.
    pub y: f64,
    /// Clear opening width.
    pub width: f64,
}

const ORIGIN_TOLERANCE: f64 = 1e-9;

/// The room being furnished.
///
/// Coordinates are in feet with the origin at the front-left corner; `y`
/// grows away from the front wall.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoomBoundary {
    /// Polygon vertices, counter-clockwise.
    pub vertices: Vec<(f64, f64)>,
    /// Bounding width.
    pub width: f64,
    /// Bounding height.
    pub height: f64,
    /// Exits.
    #[cfg_attr(feature = "serde", serde(default))]
    pub exits: Vec<Exit>,
    /// Optional stage or focal area.
    #[cfg_attr(feature = "serde", serde(default))]
    pub focal_polygon: Option<Vec<(f64, f64)>>,
}

impl RoomBoundary {
    /// Creates a room from polygon vertices; width and height come from the bounds.
    pub fn new(vertices: Vec<(f64, f64)>) -> Self {
        let width = vertices.iter().map(|v| v.0).fold(0.0, f64::max);
        let height = vertices.iter().map(|v| v.1).fold(0.0, f64::max);
        Self {
            vertices,
            width,
            height,
            exits: Vec::new(),
            focal_polygon: None,
        }
    }

    /// Creates a rectangular room.
    pub fn rectangle(width: f64, height: f64) -> Self {
        Self {
            vertices: vec![(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)],
            width,
            height,
            exits: Vec::new(),
            focal_polygon: None,
        }
    }

    /// Adds an exit.
    pub fn with_exit(mut self, x: f64, y: f64, width: f64) -> Self {
        self.exits.push(Exit { x, y, width });
        self
    }

    /// Sets the focal polygon.
    pub fn with_focal_polygon(mut self, polygon: Vec<(f64, f64)>) -> Self {
        self.focal_polygon = Some(polygon);
        self
    }

    /// Floor area.
    pub fn area(&self) -> f64 {
        polygon_area(&self.vertices)
    }

    /// Center of the bounding rectangle.
    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Checks that the room is usable.
    pub fn validate(&self) -> Result<()> {
        if self.vertices.len() < 3 {
            return Err(Error::InvalidRoom(format!(
                "polygon needs at least 3 vertices, got {}",
                self.vertices.len()
            )));
        }
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(Error::InvalidRoom(format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.area() <= f64::EPSILON {
            return Err(Error::InvalidRoom("polygon has zero area".to_string()));
        }
        // Grids, clamping and templates all span [0, width] x [0, height].
        let min_x = self.vertices.iter().map(|v| v.0).fold(f64::INFINITY, f64::min);
        let min_y = self.vertices.iter().map(|v| v.1).fold(f64::INFINITY, f64::min);
        if min_x.abs() > ORIGIN_TOLERANCE || min_y.abs() > ORIGIN_TOLERANCE {
            return Err(Error::InvalidRoom(format!(
                "polygon must start at the origin, bounding box starts at ({}, {})",
                min_x, min_y
            )));
        }
        if let Some(exit) = self.exits.iter().find(|e| e.width <= 0.0) {
            return Err(Error::InvalidRoom(format!(
                "exit at ({}, {}) has non-positive width",
                exit.x, exit.y
            )));
        }
        Ok(())
    }
}

/// Multipliers for the eight energy terms.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayoutWeights {
    /// Furniture overlap.
    pub overlap: f64,
    /// Aisle clearance.
    pub aisle: f64,
    /// Egress travel distance.
    pub egress: f64,
    /// Sightlines to the focal point.
    pub sightline: f64,
    /// Seat count versus target.
    pub capacity: f64,
    /// Wheelchair spaces.
    pub ada: f64,
    /// Alignment, symmetry and balance.
    pub aesthetic: f64,
    /// Catering access.
    pub service: f64,
}

impl Default for LayoutWeights {
    fn default() -> Self {
        Self {
            overlap: 100.0,
            aisle: 10.0,
            egress: 5.0,
            sightline: 2.0,
            capacity: 1.0,
            ada: 5.0,
            aesthetic: 0.5,
            service: 2.0,
        }
    }
}

impl LayoutWeights {
    /// All weights zero.
    pub fn zero() -> Self {
        Self {
            overlap: 0.0,
            aisle: 0.0,
            egress: 0.0,
            sightline: 0.0,
            capacity: 0.0,
            ada: 0.0,
            aesthetic: 0.0,
            service: 0.0,
        }
    }

    /// Weights as an array in term order.
    pub fn as_array(&self) -> [f64; 8] {
        [
            self.overlap,
            self.aisle,
            self.egress,
            self.sightline,
            self.capacity,
            self.ada,
            self.aesthetic,
            self.service,
        ]
    }
}

/// A furnished room with its cached energy.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Layout {
    /// Placed items.
    pub items: Vec<FurnitureItem>,
    /// The room.
    pub room: RoomBoundary,
    /// Energy under the weights used to produce this layout.
    #[cfg_attr(feature = "serde", serde(default))]
    pub energy: f64,
}

impl Layout {
    /// Creates a layout with zero cached energy.
    pub fn new(items: Vec<FurnitureItem>, room: RoomBoundary) -> Self {
        Self {
            items,
            room,
            energy: 0.0,
        }
    }

    /// Sets the cached energy.
    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = energy;
        self
    }

    /// Total seats.
    pub fn total_seats(&self) -> u32 {
        self.items.iter().map(|i| i.seats).sum()
    }

    /// Number of items of `kind`.
    pub fn count(&self, kind: FurnitureKind) -> usize {
        self.items.iter().filter(|i| i.kind == kind).count()
    }

    /// Validates the room and every item.
    pub fn validate(&self) -> Result<()> {
        self.room.validate()?;
        for (index, item) in self.items.iter().enumerate() {
            item.validate(index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_predicates() {
        assert!(FurnitureKind::RoundTable.is_table());
        assert!(!FurnitureKind::Chair.blocks_paths());
        assert!(FurnitureKind::Bar.is_service());
        assert!(FurnitureKind::Podium.is_focal());
        for kind in FurnitureKind::ALL {
            let (w, d) = kind.default_dimensions();
            assert!(w > 0.0 && d > 0.0, "{}", kind.label());
        }
    }

    #[test]
    fn test_item_validate() {
        let ok = FurnitureItem::of_kind(FurnitureKind::Chair, 1.0, 1.0);
        assert_eq!(ok.seats, 1);
        assert!(ok.validate(0).is_ok());

        let bad = FurnitureItem::new(FurnitureKind::Bar, 1.0, 1.0, 0.0, 2.0);
        match bad.validate(4) {
            Err(Error::InvalidFurniture { index, .. }) => assert_eq!(index, 4),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_room_rectangle() {
        let room = RoomBoundary::rectangle(60.0, 40.0).with_exit(30.0, 40.0, 6.0);
        assert!((room.area() - 2400.0).abs() < 1e-9);
        assert_eq!(room.center(), (30.0, 20.0));
        assert!(room.validate().is_ok());
    }

    #[test]
    fn test_room_validate_rejects_degenerate() {
        let room = RoomBoundary::new(vec![(0.0, 0.0), (10.0, 0.0)]);
        assert!(matches!(room.validate(), Err(Error::InvalidRoom(_))));

        let room = RoomBoundary::rectangle(10.0, 10.0).with_exit(0.0, 5.0, 0.0);
        assert!(room.validate().is_err());
    }

    #[test]
    fn test_room_validate_rejects_offset_polygon() {
        let room = RoomBoundary::new(vec![(5.0, 5.0), (25.0, 5.0), (25.0, 20.0), (5.0, 20.0)]);
        assert!(matches!(room.validate(), Err(Error::InvalidRoom(_))));

        let l_shape = RoomBoundary::new(vec![
            (0.0, 0.0),
            (20.0, 0.0),
            (20.0, 10.0),
            (10.0, 10.0),
            (10.0, 20.0),
            (0.0, 20.0),
        ]);
        assert!(l_shape.validate().is_ok());
        assert_eq!((l_shape.width, l_shape.height), (20.0, 20.0));
    }

    #[test]
    fn test_layout_counts() {
        let room = RoomBoundary::rectangle(20.0, 20.0);
        let layout = Layout::new(
            vec![
                FurnitureItem::of_kind(FurnitureKind::Chair, 1.0, 1.0),
                FurnitureItem::of_kind(FurnitureKind::Chair, 3.0, 1.0),
                FurnitureItem::of_kind(FurnitureKind::RoundTable, 10.0, 10.0),
            ],
            room,
        );
        assert_eq!(layout.total_seats(), 2);
        assert_eq!(layout.count(FurnitureKind::Chair), 2);
        assert!(layout.validate().is_ok());
    }
}
