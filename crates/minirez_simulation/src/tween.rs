//! Линейные tween-помощники для анимаций панели
//!
//! Прогресс живёт в самих состояниях (Showing/Hiding/Expanding несут
//! progress 0..1), здесь только арифметика шага.

/// Продвигает прогресс на dt вперёд, с насыщением в 1.0.
/// Нулевая длительность — мгновенное завершение.
pub fn advance(progress: f32, dt: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    (progress + dt / duration).min(1.0)
}

/// Линейная интерполяция скаляра по прогрессу
pub fn lerp(from: f32, to: f32, progress: f32) -> f32 {
    from + (to - from) * progress.clamp(0.0, 1.0)
}
