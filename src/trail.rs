//! Bounded position history for trail rendering.

use glam::Vec2;
use std::collections::VecDeque;

/// The most recent positions of a particle, oldest first.
///
/// Holds at most `capacity` points; pushing beyond that drops the oldest.
/// Trails are only ever read by renderers, never by physics.
#[derive(Debug, Clone, Default)]
pub struct Trail {
    points: VecDeque<Vec2>,
    capacity: usize,
}

impl Trail {
    /// Create an empty trail holding at most `capacity` points.
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.saturating_add(1)),
            capacity,
        }
    }

    /// Append a point, dropping the oldest one if the bound is exceeded.
    pub fn push(&mut self, point: Vec2) {
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    /// Number of stored points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no points are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Maximum number of stored points.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Points from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Vec2> + '_ {
        self.points.iter()
    }

    /// Consecutive point pairs from oldest to newest.
    pub fn segments(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        self.points.iter().zip(self.points.iter().skip(1)).map(|(a, b)| (*a, *b))
    }

    /// The newest point, if any.
    pub fn newest(&self) -> Option<Vec2> {
        self.points.back().copied()
    }

    /// The oldest point, if any.
    pub fn oldest(&self) -> Option<Vec2> {
        self.points.front().copied()
    }
}
