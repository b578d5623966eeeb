//! Deterministic starting layouts from a short description.
//!
//! [`parse_description`] is a keyword parser: it picks a [`LayoutStyle`] and a
//! guest count out of free text. [`generate_template_layout`] then lays out
//! the room in that style, respecting the clearances the energy function
//! checks so the optimizer starts from a near-compliant arrangement.
//!
//! | Style | Arrangement |
//! |-------|-------------|
//! | Theater | Stage at the front wall, rows of chairs split by a center aisle |
//! | Banquet | Round tables with 8 chairs, bar on a side wall, dance floor for > 50 guests |
//! | Classroom | Podium, rows of rectangular tables with chairs behind |
//! | Cocktail | Standing high-tops on a grid with bars on the side walls |
//! | Boardroom | One long table with chairs along both sides and at the heads |
//! | UShape | Rectangular tables in a U open towards a podium |
//!
//! If the room cannot hold the requested capacity the layout is filled as far
//! as it goes and a warning is logged.

use crate::energy::{compute_layout_energy, required_aisle};
use crate::furniture::{FurnitureItem, FurnitureKind, Layout, LayoutWeights, RoomBoundary};
use crate::geometry::Aabb;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Guest count used when the description names none.
pub const DEFAULT_CAPACITY: u32 = 100;

/// Added to every computed clearance so rounding never lands under a minimum.
const SLACK: f64 = 0.05;
/// Half extent of a chair.
const CHAIR_HALF: f64 = 0.75;
/// Distance a table keeps from the walls.
const TABLE_WALL_CLEARANCE: f64 = 5.0;
/// Radius of the chair ring around a round table.
const RING_RADIUS: f64 = 5.1;
/// Center spacing of round-table clusters.
const CLUSTER_PITCH: f64 = 12.5;
/// Guests per wheelchair space.
const SEATS_PER_ADA: u32 = 25;

/// Seating style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LayoutStyle {
    /// Rows facing a stage.
    Theater,
    /// Round dining tables.
    #[default]
    Banquet,
    /// Tables in rows facing a podium.
    Classroom,
    /// Standing reception.
    Cocktail,
    /// Single conference table.
    Boardroom,
    /// Tables in a U.
    UShape,
}

impl LayoutStyle {
    /// All styles.
    pub const ALL: [LayoutStyle; 6] = [
        LayoutStyle::Theater,
        LayoutStyle::Banquet,
        LayoutStyle::Classroom,
        LayoutStyle::Cocktail,
        LayoutStyle::Boardroom,
        LayoutStyle::UShape,
    ];

    /// Canonical label.
    pub fn label(self) -> &'static str {
        match self {
            LayoutStyle::Theater => "theater",
            LayoutStyle::Banquet => "banquet",
            LayoutStyle::Classroom => "classroom",
            LayoutStyle::Cocktail => "cocktail",
            LayoutStyle::Boardroom => "boardroom",
            LayoutStyle::UShape => "u-shape",
        }
    }

    /// Words that select this style in a description.
    fn keywords(self) -> &'static [&'static str] {
        match self {
            LayoutStyle::UShape => &["u-shape", "u-shaped", "ushape", "horseshoe"],
            LayoutStyle::Boardroom => &["boardroom", "board", "conference", "executive"],
            LayoutStyle::Classroom => &["classroom", "training", "workshop", "seminar", "class"],
            LayoutStyle::Theater => &[
                "theater",
                "theatre",
                "auditorium",
                "lecture",
                "keynote",
                "presentation",
                "concert",
            ],
            LayoutStyle::Cocktail => &["cocktail", "reception", "mixer", "networking", "standing"],
            LayoutStyle::Banquet => &["banquet", "dinner", "wedding", "gala", "dining", "luncheon"],
        }
    }
}

impl fmt::Display for LayoutStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LayoutStyle {
    type Err = venue_core::Error;

    fn from_str(s: &str) -> venue_core::Result<Self> {
        let lower = s.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        LayoutStyle::ALL
            .into_iter()
            .find(|style| style.label() == lower || style.keywords().contains(&lower.as_str()))
            .ok_or_else(|| venue_core::Error::InvalidConfig(format!("unknown layout style '{}'", s)))
    }
}

/// Style and capacity extracted from a description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParsedDescription {
    /// Seating style.
    pub style: LayoutStyle,
    /// Guest count.
    pub capacity: u32,
}

const CAPACITY_WORDS: [&str; 10] = [
    "guests",
    "guest",
    "people",
    "persons",
    "attendees",
    "seats",
    "pax",
    "participants",
    "delegates",
    "visitors",
];

/// Extracts a style and capacity; defaults to banquet for 100.
///
/// The capacity is the first number directly before (or after) one of the
/// head-count words, e.g. "200 guests" or "seats: 80".
pub fn parse_description(text: &str) -> ParsedDescription {
    let lower = text.to_ascii_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .filter(|t| !t.is_empty())
        .collect();

    let joined = tokens.join(" ");
    // Specific arrangements win over generic event words.
    let style = [
        LayoutStyle::UShape,
        LayoutStyle::Boardroom,
        LayoutStyle::Classroom,
        LayoutStyle::Theater,
        LayoutStyle::Cocktail,
    ]
    .into_iter()
    .find(|s| {
        s.keywords().iter().any(|k| tokens.contains(k))
            || (*s == LayoutStyle::UShape && joined.contains("u shape"))
    })
    .unwrap_or_default();

    let is_count_word = |t: &str| CAPACITY_WORDS.contains(&t);
    let capacity = tokens
        .iter()
        .enumerate()
        .find_map(|(k, t)| {
            let n: u32 = t.parse().ok()?;
            let before = k > 0 && is_count_word(tokens[k - 1]);
            let after = tokens.get(k + 1).is_some_and(|next| is_count_word(*next));
            (n > 0 && (after || before)).then_some(n)
        })
        .unwrap_or(DEFAULT_CAPACITY);

    ParsedDescription { style, capacity }
}

/// Lays out `room` in `style` for `capacity` guests.
///
/// Deterministic for a given seed; the cached energy uses default weights.
pub fn generate_template_layout(
    room: &RoomBoundary,
    style: LayoutStyle,
    capacity: u32,
    seed: u64,
) -> Layout {
    let mut rng = StdRng::seed_from_u64(seed);
    let items = match style {
        LayoutStyle::Theater => theater(room, capacity),
        LayoutStyle::Banquet => banquet(room, capacity),
        LayoutStyle::Classroom => classroom(room, capacity),
        LayoutStyle::Cocktail => cocktail(room, capacity, &mut rng),
        LayoutStyle::Boardroom => boardroom(room, capacity),
        LayoutStyle::UShape => u_shape(room, capacity),
    };

    let seats: u32 = items.iter().map(|i| i.seats).sum();
    if seats < capacity {
        log::warn!(
            "{} layout fits {} of {} requested seats in a {}x{} room",
            style,
            seats,
            capacity,
            room.width,
            room.height
        );
    }

    let energy = compute_layout_energy(&items, room, &LayoutWeights::default(), capacity);
    log::debug!(
        "template {}: {} items, {} seats, energy {:.3}",
        style,
        items.len(),
        seats,
        energy
    );
    Layout::new(items, room.clone()).with_energy(energy)
}

fn chair(x: f64, y: f64) -> FurnitureItem {
    FurnitureItem::of_kind(FurnitureKind::Chair, x, y)
}

/// True when a `kind` footprint within `bounds` keeps the required aisle from
/// every item in `others`.
fn clear_of(bounds: &Aabb, kind: FurnitureKind, others: &[FurnitureItem]) -> bool {
    others.iter().all(|o| {
        let aisle = required_aisle(kind, o.kind).unwrap_or(0.0) + SLACK;
        !bounds.expand(aisle).intersects(&o.obb().aabb())
    })
}

/// Centers `count` slots of `pitch` around `center`.
fn centered(center: f64, count: usize, pitch: f64) -> impl Iterator<Item = f64> {
    let half = (count as f64 - 1.0) / 2.0;
    (0..count).map(move |k| center + (k as f64 - half) * pitch)
}

fn theater(room: &RoomBoundary, capacity: u32) -> Vec<FurnitureItem> {
    const FRONT_MARGIN: f64 = 1.0;
    const SIDE_MARGIN: f64 = 4.0;
    const BACK_MARGIN: f64 = 3.0;
    const CENTER_AISLE: f64 = 4.0;
    const SEAT_PITCH: f64 = 2.0;
    const ROW_PITCH: f64 = 3.0;
    const STAGE_AISLE: f64 = 4.5;

    let (w, h) = (room.width, room.height);
    let (sw, sd) = FurnitureKind::Stage.default_dimensions();
    let (sw, sd) = (sw.min(w * 0.5), sd.min(h * 0.2));
    let stage = FurnitureItem::new(FurnitureKind::Stage, w / 2.0, FRONT_MARGIN + sd / 2.0, sw, sd);
    let mut items = vec![stage];

    let half_span = w / 2.0 - SIDE_MARGIN - CENTER_AISLE / 2.0 - 2.0 * CHAIR_HALF;
    if half_span < 0.0 {
        return items;
    }
    let per_side = (half_span / SEAT_PITCH).floor() as usize + 1;

    let mut placed = 0;
    let mut y = FRONT_MARGIN + sd + STAGE_AISLE + CHAIR_HALF + SLACK;
    while placed < capacity && y + CHAIR_HALF <= h - BACK_MARGIN {
        // Fill from the center aisle outwards, alternating sides.
        'row: for k in 0..per_side {
            let offset = CENTER_AISLE / 2.0 + CHAIR_HALF + k as f64 * SEAT_PITCH;
            for side in [-1.0, 1.0] {
                if placed >= capacity {
                    break 'row;
                }
                items.push(chair(w / 2.0 + side * offset, y));
                placed += 1;
            }
        }
        y += ROW_PITCH;
    }
    items
}

/// A round table ringed by `chairs` chairs; the east seat is left open for a
/// wheelchair when `accessible`.
fn round_table_cluster(x: f64, y: f64, chairs: u32, accessible: bool) -> Vec<FurnitureItem> {
    let mut items = vec![FurnitureItem::of_kind(FurnitureKind::RoundTable, x, y)];
    let slots = (0..8).filter(|&k| !(accessible && k == 0));
    for k in slots.take(chairs as usize) {
        let angle = k as f64 * FRAC_PI_4;
        items.push(chair(x + RING_RADIUS * angle.cos(), y + RING_RADIUS * angle.sin()));
    }
    items
}

fn cluster_bounds(x: f64, y: f64) -> Aabb {
    let r = RING_RADIUS + CHAIR_HALF;
    Aabb::new(x - r, y - r, x + r, y + r)
}

fn banquet(room: &RoomBoundary, capacity: u32) -> Vec<FurnitureItem> {
    const FRONT_MARGIN: f64 = 1.0;
    const BAR_WALL_GAP: f64 = 1.0;

    let (w, h) = (room.width, room.height);
    let mut fixed = Vec::new();

    if capacity > 50 {
        let (dw, dd) = FurnitureKind::DanceFloor.default_dimensions();
        fixed.push(FurnitureItem::new(
            FurnitureKind::DanceFloor,
            w / 2.0,
            FRONT_MARGIN + dd / 2.0,
            dw.min(w * 0.4),
            dd.min(h * 0.4),
        ));
    }
    let (bw, bd) = FurnitureKind::Bar.default_dimensions();
    fixed.push(
        FurnitureItem::new(FurnitureKind::Bar, w - BAR_WALL_GAP - bd / 2.0, h / 2.0, bw, bd)
            .with_rotation(FRAC_PI_2),
    );

    let margin = TABLE_WALL_CLEARANCE + 2.5;
    let cols = (((w - 2.0 * margin) / CLUSTER_PITCH).floor() as usize) + 1;
    let rows = (((h - 2.0 * margin) / CLUSTER_PITCH).floor() as usize) + 1;
    let mut sites = Vec::new();
    if w >= 2.0 * margin && h >= 2.0 * margin {
        for y in centered(h / 2.0, rows, CLUSTER_PITCH) {
            for x in centered(w / 2.0, cols, CLUSTER_PITCH) {
                if clear_of(&cluster_bounds(x, y), FurnitureKind::RoundTable, &fixed) {
                    sites.push((x, y));
                }
            }
        }
    }

    let mut accessible_left = capacity.div_ceil(SEATS_PER_ADA).max(1);
    let mut remaining = capacity;
    let mut items = fixed;
    for (x, y) in sites {
        if remaining == 0 {
            break;
        }
        let accessible = accessible_left > 0;
        let per_table = if accessible { 7 } else { 8 };
        let chairs = remaining.min(per_table);
        items.extend(round_table_cluster(x, y, chairs, accessible));
        remaining -= chairs;
        accessible_left = accessible_left.saturating_sub(1);
    }
    items
}

fn classroom(room: &RoomBoundary, capacity: u32) -> Vec<FurnitureItem> {
    const TABLE_PITCH_X: f64 = 9.0;
    const ROW_PITCH: f64 = 7.5;

    let (w, h) = (room.width, room.height);
    let (_, pd) = FurnitureKind::Podium.default_dimensions();
    let podium_y = 1.0 + pd / 2.0;
    let mut items = vec![FurnitureItem::of_kind(FurnitureKind::Podium, w / 2.0, podium_y)];

    let (tw, td) = FurnitureKind::RectTable.default_dimensions();
    let cols = ((w - 2.0 * TABLE_WALL_CLEARANCE + 3.0) / TABLE_PITCH_X).floor() as usize;
    let chair_offset = td / 2.0 + 1.5 + CHAIR_HALF + SLACK;

    let mut placed = 0;
    let mut y = (podium_y + pd / 2.0 + 4.5 + td / 2.0 + SLACK).max(TABLE_WALL_CLEARANCE + td / 2.0);
    while placed < capacity
        && y + td / 2.0 <= h - TABLE_WALL_CLEARANCE
        && y + chair_offset + CHAIR_HALF <= h
    {
        for x in centered(w / 2.0, cols, TABLE_PITCH_X) {
            if placed >= capacity {
                break;
            }
            items.push(FurnitureItem::new(FurnitureKind::RectTable, x, y, tw, td));
            for dx in [-tw / 4.0, tw / 4.0] {
                if placed < capacity {
                    items.push(chair(x + dx, y + chair_offset));
                    placed += 1;
                }
            }
        }
        y += ROW_PITCH;
    }
    items
}

fn cocktail(room: &RoomBoundary, capacity: u32, rng: &mut StdRng) -> Vec<FurnitureItem> {
    const HIGH_TOP: f64 = 3.0;
    const GUESTS_PER_HIGH_TOP: u32 = 4;
    const PITCH: f64 = 9.0;
    const JITTER: f64 = 0.5;

    let (w, h) = (room.width, room.height);
    let (bw, bd) = FurnitureKind::Bar.default_dimensions();
    let bar = |x: f64| {
        FurnitureItem::new(FurnitureKind::Bar, x, h / 2.0, bw, bd).with_rotation(FRAC_PI_2)
    };
    let mut items = vec![bar(1.0 + bd / 2.0)];
    if w >= 30.0 {
        items.push(bar(w - 1.0 - bd / 2.0));
    }
    let bars = items.clone();

    let margin = TABLE_WALL_CLEARANCE + HIGH_TOP / 2.0 + JITTER;
    let mut remaining = capacity;
    let mut y = margin;
    while remaining > 0 && y <= h - margin {
        let mut x = margin;
        while remaining > 0 && x <= w - margin {
            let bounds = Aabb::new(
                x - HIGH_TOP / 2.0 - JITTER,
                y - HIGH_TOP / 2.0 - JITTER,
                x + HIGH_TOP / 2.0 + JITTER,
                y + HIGH_TOP / 2.0 + JITTER,
            );
            if clear_of(&bounds, FurnitureKind::RoundTable, &bars) {
                let jx = rng.gen_range(-JITTER..=JITTER);
                let jy = rng.gen_range(-JITTER..=JITTER);
                let guests = remaining.min(GUESTS_PER_HIGH_TOP);
                items.push(
                    FurnitureItem::new(FurnitureKind::RoundTable, x + jx, y + jy, HIGH_TOP, HIGH_TOP)
                        .with_seats(guests),
                );
                remaining -= guests;
            }
            x += PITCH;
        }
        y += PITCH;
    }
    items
}

fn boardroom(room: &RoomBoundary, capacity: u32) -> Vec<FurnitureItem> {
    const SEAT_PITCH: f64 = 2.5;
    const TABLE_DEPTH: f64 = 4.0;

    let (w, h) = (room.width, room.height);
    let (cx, cy) = (w / 2.0, h / 2.0);
    let head_offset = 1.5 + CHAIR_HALF + SLACK;
    let max_len = w - 2.0 * TABLE_WALL_CLEARANCE;
    let wanted_side = capacity.saturating_sub(2).div_ceil(2).max(1) as f64;
    let fit_side = ((max_len - 1.0) / SEAT_PITCH).floor().max(1.0);
    let per_side = wanted_side.min(fit_side) as usize;
    let length = (per_side as f64 * SEAT_PITCH + 1.0).max(6.0).min(max_len.max(2.0));

    let mut items = vec![FurnitureItem::new(
        FurnitureKind::RectTable,
        cx,
        cy,
        length,
        TABLE_DEPTH,
    )];

    let side_y = TABLE_DEPTH / 2.0 + head_offset;
    let mut placed = 0;
    'sides: for x in centered(cx, per_side, SEAT_PITCH) {
        for dy in [-side_y, side_y] {
            if placed >= capacity {
                break 'sides;
            }
            items.push(chair(x, cy + dy));
            placed += 1;
        }
    }
    for dx in [-(length / 2.0 + head_offset), length / 2.0 + head_offset] {
        if placed < capacity && cx + dx - CHAIR_HALF >= 0.0 && cx + dx + CHAIR_HALF <= w {
            items.push(chair(cx + dx, cy));
            placed += 1;
        }
    }
    items
}

fn place_chairs(items: &mut Vec<FurnitureItem>, at: &[(f64, f64)], placed: &mut u32, capacity: u32) {
    for &(x, y) in at {
        if *placed >= capacity {
            return;
        }
        items.push(chair(x, y));
        *placed += 1;
    }
}

fn u_shape(room: &RoomBoundary, capacity: u32) -> Vec<FurnitureItem> {
    const PITCH: f64 = 9.0;
    const TABLE_GAP: f64 = 3.0 + SLACK;

    let (w, h) = (room.width, room.height);
    let (tw, td) = FurnitureKind::RectTable.default_dimensions();
    let (_, pd) = FurnitureKind::Podium.default_dimensions();
    let podium_y = 1.0 + pd / 2.0;
    let mut items = vec![FurnitureItem::of_kind(FurnitureKind::Podium, w / 2.0, podium_y)];

    let chair_offset = td / 2.0 + 1.5 + CHAIR_HALF + SLACK;
    let n_tables = capacity.div_ceil(2) as usize;

    // Base row along the back wall, legs running towards the podium.
    let leg_reach = TABLE_GAP + td / 2.0;
    let base_room = w - 2.0 * (TABLE_WALL_CLEARANCE + td + TABLE_GAP);
    let base_fit = ((base_room + PITCH - tw) / PITCH).floor().max(1.0) as usize;
    let n_base = (n_tables / 3).clamp(1, base_fit);
    let y_base = h - TABLE_WALL_CLEARANCE - td / 2.0 - 0.75;
    let base_xs: Vec<f64> = centered(w / 2.0, n_base, PITCH).collect();
    let base_left = base_xs.first().copied().unwrap_or(w / 2.0) - tw / 2.0;
    let x_left = base_left - leg_reach;
    let x_right = w - x_left;

    let mut placed = 0;
    for &x in &base_xs {
        if placed >= capacity {
            break;
        }
        let chairs = [(x - tw / 4.0, y_base + chair_offset), (x + tw / 4.0, y_base + chair_offset)];
        items.push(FurnitureItem::new(FurnitureKind::RectTable, x, y_base, tw, td));
        place_chairs(&mut items, &chairs, &mut placed, capacity);
    }

    let legs_fit = x_left - td / 2.0 >= TABLE_WALL_CLEARANCE;
    let leg_floor = podium_y + pd / 2.0 + 4.5 + tw / 2.0;
    let mut y = y_base;
    while legs_fit && placed < capacity && y >= leg_floor {
        for (x, out) in [(x_left, -1.0), (x_right, 1.0)] {
            if placed >= capacity {
                break;
            }
            let cx = x + out * chair_offset;
            let chairs = [(cx, y - tw / 4.0), (cx, y + tw / 4.0)];
            items.push(
                FurnitureItem::new(FurnitureKind::RectTable, x, y, tw, td).with_rotation(FRAC_PI_2),
            );
            place_chairs(&mut items, &chairs, &mut placed, capacity);
        }
        y -= PITCH;
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> RoomBoundary {
        RoomBoundary::rectangle(60.0, 40.0).with_exit(30.0, 40.0, 6.0)
    }

    #[test]
    fn test_parse_description() {
        let parsed = parse_description("Theater style keynote for 250 attendees");
        assert_eq!(parsed.style, LayoutStyle::Theater);
        assert_eq!(parsed.capacity, 250);

        let parsed = parse_description("wedding dinner, guests: 120");
        assert_eq!(parsed.style, LayoutStyle::Banquet);
        assert_eq!(parsed.capacity, 120);

        let parsed = parse_description("A U-shape workshop with 24 people");
        assert_eq!(parsed.style, LayoutStyle::UShape);
        assert_eq!(parsed.capacity, 24);
    }

    #[test]
    fn test_parse_defaults() {
        let parsed = parse_description("something nice in room 12");
        assert_eq!(parsed.style, LayoutStyle::Banquet);
        assert_eq!(parsed.capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn test_style_from_str() {
        assert_eq!("u shape".parse::<LayoutStyle>().ok(), Some(LayoutStyle::UShape));
        assert_eq!("Theatre".parse::<LayoutStyle>().ok(), Some(LayoutStyle::Theater));
        assert!("picnic".parse::<LayoutStyle>().is_err());
    }

    #[test]
    fn test_theater_layout() {
        let layout = generate_template_layout(&room(), LayoutStyle::Theater, 80, 1);
        assert_eq!(layout.count(FurnitureKind::Stage), 1);
        let chairs = layout.count(FurnitureKind::Chair);
        assert!((40..=80).contains(&chairs), "{} chairs", chairs);
        let stage = layout.items.iter().find(|i| i.kind == FurnitureKind::Stage);
        assert!(stage.is_some_and(|s| s.y < 20.0));
    }

    #[test]
    fn test_banquet_dance_floor_rule() {
        let big = generate_template_layout(&room(), LayoutStyle::Banquet, 80, 1);
        assert_eq!(big.count(FurnitureKind::DanceFloor), 1);
        let small = generate_template_layout(&room(), LayoutStyle::Banquet, 50, 1);
        assert_eq!(small.count(FurnitureKind::DanceFloor), 0);
        assert_eq!(small.total_seats(), 50);
        assert!(small.count(FurnitureKind::RoundTable) >= 7);
    }

    #[test]
    fn test_every_style_stays_in_room() {
        for style in LayoutStyle::ALL {
            let layout = generate_template_layout(&room(), style, 40, 3);
            assert!(!layout.items.is_empty(), "{}", style);
            assert!(layout.total_seats() <= 40, "{}", style);
            for item in &layout.items {
                for (x, y) in item.obb().corners() {
                    assert!((-1.0..=61.0).contains(&x), "{} {:?}", style, item);
                    assert!((-1.0..=41.0).contains(&y), "{} {:?}", style, item);
                }
            }
        }
    }

    #[test]
    fn test_template_has_no_overlap() {
        for style in LayoutStyle::ALL {
            let layout = generate_template_layout(&room(), style, 30, 5);
            let overlap = crate::energy::overlap_energy(&layout.items);
            assert!(overlap < 1e-9, "{} overlap {}", style, overlap);
        }
    }

    #[test]
    fn test_deterministic_per_seed() {
        for style in LayoutStyle::ALL {
            let a = generate_template_layout(&room(), style, 60, 17);
            let b = generate_template_layout(&room(), style, 60, 17);
            assert_eq!(a, b);
        }
    }
}
