//! Line-level diffing.
//!
//! [`diff_lines`] compares a base text against another text and returns an
//! ordered list of [`DiffSegment`]s covering both inputs. Lines keep their
//! terminators, so concatenating the unchanged and removed segments rebuilds
//! the base, and concatenating the unchanged and added segments rebuilds the
//! other text.
//!
//! The shortest edit script is computed with Myers' O(ND) algorithm after
//! trimming the common prefix and suffix. Inputs further apart than
//! [`MAX_EDIT_DISTANCE`] are reported as one removal and one addition, which
//! keeps memory bounded. Inside each change hunk, removed lines are always
//! reported before added lines.

use serde::Serialize;

/// Segment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Present in both texts.
    Unchanged,
    /// Present only in the other text.
    Added,
    /// Present only in the base text.
    Removed,
}

/// A run of consecutive lines sharing one [`SegmentKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSegment<'a> {
    pub kind: SegmentKind,
    pub lines: Vec<&'a str>,
}

impl<'a> DiffSegment<'a> {
    fn new(kind: SegmentKind) -> Self {
        Self {
            kind,
            lines: Vec::new(),
        }
    }

    /// Concatenated text of the segment.
    pub fn text(&self) -> String {
        self.lines.concat()
    }
}

/// Split text into lines, keeping the `\n` terminator on each line.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Compute the line diff of `base` against `other`.
pub fn diff_lines<'a>(base: &'a str, other: &'a str) -> Vec<DiffSegment<'a>> {
    let old = split_lines(base);
    let new = split_lines(other);

    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut builder = SegmentBuilder::default();
    for line in &old[..prefix] {
        builder.push(SegmentKind::Unchanged, line);
    }
    for op in shortest_edit(old_mid, new_mid) {
        match op {
            Op::Equal(i) => builder.push(SegmentKind::Unchanged, old_mid[i]),
            Op::Delete(i) => builder.push(SegmentKind::Removed, old_mid[i]),
            Op::Insert(j) => builder.push(SegmentKind::Added, new_mid[j]),
        }
    }
    for line in &old[old.len() - suffix..] {
        builder.push(SegmentKind::Unchanged, line);
    }

    builder.finish()
}

/// Collects lines into segments, ordering each hunk as removed then added.
#[derive(Default)]
struct SegmentBuilder<'a> {
    segments: Vec<DiffSegment<'a>>,
    removed: Vec<&'a str>,
    added: Vec<&'a str>,
}

impl<'a> SegmentBuilder<'a> {
    fn push(&mut self, kind: SegmentKind, line: &'a str) {
        match kind {
            SegmentKind::Removed => self.removed.push(line),
            SegmentKind::Added => self.added.push(line),
            SegmentKind::Unchanged => {
                self.flush_hunk();
                self.append(SegmentKind::Unchanged, std::iter::once(line));
            }
        }
    }

    fn flush_hunk(&mut self) {
        let removed = std::mem::take(&mut self.removed);
        let added = std::mem::take(&mut self.added);
        if !removed.is_empty() {
            self.append(SegmentKind::Removed, removed.into_iter());
        }
        if !added.is_empty() {
            self.append(SegmentKind::Added, added.into_iter());
        }
    }

    fn append(&mut self, kind: SegmentKind, lines: impl Iterator<Item = &'a str>) {
        match self.segments.last_mut() {
            Some(last) if last.kind == kind => last.lines.extend(lines),
            _ => {
                let mut segment = DiffSegment::new(kind);
                segment.lines.extend(lines);
                self.segments.push(segment);
            }
        }
    }

    fn finish(mut self) -> Vec<DiffSegment<'a>> {
        self.flush_hunk();
        self.segments
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal(usize),
    Delete(usize),
    Insert(usize),
}

/// Edit distance past which the search gives up on a minimal script.
///
/// The backtrack trace holds `(D + 1)^2` entries for a distance `D`, so this
/// caps it at about a million.
const MAX_EDIT_DISTANCE: isize = 1024;

fn shortest_edit(old: &[&str], new: &[&str]) -> Vec<Op> {
    bounded_edit(old, new, MAX_EDIT_DISTANCE)
}

/// Myers' greedy shortest edit script, or [`replace_all`] once the distance
/// exceeds `limit`.
///
/// The furthest-reaching x per diagonal is snapshotted before every round `d`
/// as a window over diagonals `-d..=d`, which is all the backtrack needs.
fn bounded_edit(old: &[&str], new: &[&str], limit: isize) -> Vec<Op> {
    let n = old.len() as isize;
    let m = new.len() as isize;
    let max = n + m;
    if max == 0 {
        return Vec::new();
    }

    let offset = max;
    let mut v = vec![0isize; (2 * max + 1) as usize];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max {
        if d > limit {
            return replace_all(old.len(), new.len());
        }
        trace.push(v[(offset - d) as usize..=(offset + d) as usize].to_vec());

        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && old[x as usize] == new[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    let mut ops = Vec::new();
    let mut x = n;
    let mut y = m;

    for (d, window) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let at = |k: isize| window[(k + d) as usize];
        let k = x - y;

        let prev_k = if k == -d || (k != d && at(k - 1) < at(k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = if d == 0 { 0 } else { at(prev_k) };
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            ops.push(Op::Equal(x as usize));
        }
        if d > 0 {
            if x == prev_x {
                ops.push(Op::Insert((y - 1) as usize));
            } else {
                ops.push(Op::Delete((x - 1) as usize));
            }
        }
        x = prev_x;
        y = prev_y;
    }

    ops.reverse();
    ops
}

/// Delete every old line, then insert every new one.
fn replace_all(old_len: usize, new_len: usize) -> Vec<Op> {
    (0..old_len)
        .map(Op::Delete)
        .chain((0..new_len).map(Op::Insert))
        .collect()
}
