//! Deterministic window arrangement.
//!
//! All arithmetic is integer. Grid cells are cut at `floor(i * total / n)`
//! so adjacent cells share an edge and a full grid covers the viewport with
//! no gap and no overlap.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::debug;

use super::geometry::{Geometry, Viewport, WindowControls};

/// Active algorithm for all window geometry
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, AsRefStr, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Arrangement {
    None,
    Cascade,
    Tile,
    #[default]
    SmartTile,
}

/// Tunables for [`arrange`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSettings {
    /// Viewports narrower than this maximize every window
    pub narrow_breakpoint: u32,
    /// Diagonal offset between cascaded windows
    pub cascade_step: u32,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            narrow_breakpoint: 1024,
            cascade_step: 40,
        }
    }
}

/// What the layout engine needs from a window.
pub trait WindowHandle {
    fn geometry(&self) -> Geometry;
    fn set_geometry(&mut self, geometry: Geometry);
    fn set_controls(&mut self, controls: WindowControls);
    fn set_maximized(&mut self, maximized: bool);
}

/// Position every window for `mode`. Order of `windows` is registry order.
pub fn arrange<H: WindowHandle>(viewport: Viewport, mode: Arrangement, settings: &LayoutSettings, windows: &mut [H]) {
    if viewport.width < settings.narrow_breakpoint {
        debug!("viewport {} below breakpoint, maximizing {} windows", viewport, windows.len());
        maximize(viewport, windows);
        return;
    }
    debug!("arranging {} windows as {} in {}", windows.len(), mode, viewport);
    match mode {
        Arrangement::None => {
            for window in windows.iter_mut() {
                window.set_maximized(false);
                window.set_controls(WindowControls::FREE);
            }
        }
        Arrangement::Cascade => {
            let rects = cascade(viewport, settings.cascade_step, &z_order(windows));
            place(windows, &rects);
        }
        Arrangement::Tile => {
            let rects = tile(viewport, windows.len());
            place(windows, &rects);
        }
        Arrangement::SmartTile => {
            let rects = smart_tile(viewport, windows.len());
            place(windows, &rects);
        }
    }
}

fn maximize<H: WindowHandle>(viewport: Viewport, windows: &mut [H]) {
    for window in windows.iter_mut() {
        let z = window.geometry().z;
        window.set_geometry(Geometry { z, ..viewport.full() });
        window.set_maximized(true);
        window.set_controls(WindowControls::LOCKED);
    }
}

fn place<H: WindowHandle>(windows: &mut [H], rects: &[Geometry]) {
    for (window, rect) in windows.iter_mut().zip(rects) {
        let z = window.geometry().z;
        window.set_geometry(Geometry { z, ..*rect });
        window.set_maximized(false);
        window.set_controls(WindowControls::LOCKED);
    }
}

/// Rank of each window when sorted by ascending z (ties keep registry order).
fn z_order<H: WindowHandle>(windows: &[H]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..windows.len()).collect();
    indices.sort_by_key(|&i| windows[i].geometry().z);
    let mut rank = vec![0; windows.len()];
    for (r, i) in indices.into_iter().enumerate() {
        rank[i] = r;
    }
    rank
}

/// Start of cut `i` when `total` is split into `n` parts.
fn cut(i: u32, total: u32, n: u32) -> u32 {
    (u64::from(i) * u64::from(total) / u64::from(n)) as u32
}

/// Extent of part `i` of `n`
fn span(i: u32, total: u32, n: u32) -> (u32, u32) {
    let start = cut(i, total, n);
    (start, cut(i + 1, total, n) - start)
}

/// Half-size windows stepped diagonally by z rank, clamped inside the viewport.
pub fn cascade(viewport: Viewport, step: u32, ranks: &[usize]) -> Vec<Geometry> {
    let width = viewport.width / 2;
    let height = viewport.height / 2;
    let max_x = viewport.width - width;
    let max_y = viewport.height - height;
    ranks
        .iter()
        .map(|&rank| {
            let offset = u32::try_from(rank).unwrap_or(u32::MAX).saturating_mul(step);
            Geometry {
                x: offset.min(max_x),
                y: offset.min(max_y),
                z: 0,
                width,
                height,
            }
        })
        .collect()
}

/// Dimensions of the plain tile grid for `n` windows: `(cols, rows)`.
pub fn tile_grid(n: usize) -> (u32, u32) {
    if n == 0 {
        return (0, 0);
    }
    let n = n as u32;
    let cols = (n - 1).isqrt() + 1;
    let rows = n.div_ceil(cols);
    (cols, rows)
}

/// Roughly square grid filled row-major. The last row may be partial.
pub fn tile(viewport: Viewport, n: usize) -> Vec<Geometry> {
    let (cols, rows) = tile_grid(n);
    (0..n as u32)
        .map(|i| {
            let (x, width) = span(i % cols, viewport.width, cols);
            let (y, height) = span(i / cols, viewport.height, rows);
            Geometry { x, y, z: 0, width, height }
        })
        .collect()
}

/// Windows per row for the balanced grid, top to bottom.
///
/// With `k = floor(sqrt(n))` a perfect square gets a `k x k` grid. Otherwise
/// the windows are spread over `k + 1` rows as evenly as possible, so rows
/// differ by at most one window. Fuller rows come first and the extra row
/// holding the remainder is last, with its windows widened to fill it.
pub fn smart_tile_rows(n: usize) -> Vec<u32> {
    if n == 0 {
        return Vec::new();
    }
    let n = n as u32;
    let k = n.isqrt();
    let rows = if k * k == n { k } else { k + 1 };
    let base = n / rows;
    let fuller = n % rows;
    (0..rows).map(|r| if r < fuller { base + 1 } else { base }).collect()
}

/// Balanced grid: every row spans the full width, so the viewport is covered.
pub fn smart_tile(viewport: Viewport, n: usize) -> Vec<Geometry> {
    let per_row = smart_tile_rows(n);
    let rows = per_row.len() as u32;
    let mut out = Vec::with_capacity(n);
    for (r, &count) in per_row.iter().enumerate() {
        let (y, height) = span(r as u32, viewport.height, rows);
        for c in 0..count {
            let (x, width) = span(c, viewport.width, count);
            out.push(Geometry { x, y, z: 0, width, height });
        }
    }
    out
}
