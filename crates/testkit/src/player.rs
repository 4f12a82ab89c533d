//! Scripted player movement for headless streaming runs.

use glam::Vec3;

/// Walks through a list of waypoints at constant speed, then stands still.
#[derive(Debug, Clone)]
pub struct WalkingPlayer {
    position: Vec3,
    waypoints: Vec<Vec3>,
    next: usize,
    speed: f32,
}

impl WalkingPlayer {
    /// Start at `start`, heading for each waypoint in turn at `speed` units/s.
    pub fn new(start: Vec3, waypoints: Vec<Vec3>, speed: f32) -> Self {
        Self {
            position: start,
            waypoints,
            next: 0,
            speed,
        }
    }

    /// Walk in a straight line from `start` to `end`.
    pub fn straight(start: Vec3, end: Vec3, speed: f32) -> Self {
        Self::new(start, vec![end], speed)
    }

    /// Current position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Whether every waypoint has been reached.
    pub fn arrived(&self) -> bool {
        self.next >= self.waypoints.len()
    }

    /// Advance by `dt` seconds and return the new position.
    pub fn step(&mut self, dt: f32) -> Vec3 {
        let mut budget = self.speed * dt;
        while budget > 0.0 {
            let Some(&target) = self.waypoints.get(self.next) else {
                break;
            };
            let to_target = target - self.position;
            let distance = to_target.length();
            if distance <= budget {
                self.position = target;
                budget -= distance;
                self.next += 1;
            } else {
                self.position += to_target / distance * budget;
                budget = 0.0;
            }
        }
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_waypoints_in_order() {
        let mut player = WalkingPlayer::new(
            Vec3::ZERO,
            vec![Vec3::new(10.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 10.0)],
            5.0,
        );
        assert_eq!(player.step(1.0), Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(player.step(2.0), Vec3::new(10.0, 0.0, 5.0));
        assert_eq!(player.step(10.0), Vec3::new(10.0, 0.0, 10.0));
        assert!(player.arrived());
        assert_eq!(player.step(1.0), Vec3::new(10.0, 0.0, 10.0));
    }
}
