// Combatant state shared by the player and the enemy.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub atk: i32,
    pub def: i32,
}

impl Character {
    /// Creates a character at full health.
    pub fn new(name: impl Into<String>, max_hp: i32, atk: i32, def: i32) -> Self {
        let max_hp = max_hp.max(1);
        Self {
            name: name.into(),
            hp: max_hp,
            max_hp,
            atk: atk.max(0),
            def: def.max(0),
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.hp == 0
    }

    /// Removes up to `amount` hp and returns how much was actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.set_hp(i64::from(self.hp) - i64::from(amount.max(0)));
        before - self.hp
    }

    /// Restores up to `amount` hp and returns how much was actually gained.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.set_hp(i64::from(self.hp) + i64::from(amount.max(0)));
        self.hp - before
    }

    pub fn restore(&mut self) {
        self.hp = self.max_hp;
    }

    /// Scales max hp and attack for the next round and restores health.
    pub fn grow(&mut self, factor: f64) {
        self.max_hp = scale(self.max_hp, factor).max(1);
        self.atk = scale(self.atk, factor);
        self.restore();
    }

    fn set_hp(&mut self, hp: i64) {
        // Clamp in i64 so extreme amounts cannot wrap.
        self.hp = hp.clamp(0, i64::from(self.max_hp)) as i32;
        debug_assert!((0..=self.max_hp).contains(&self.hp));
    }
}

fn scale(value: i32, factor: f64) -> i32 {
    let scaled = (f64::from(value) * factor).floor();
    if scaled.is_finite() {
        scaled.clamp(0.0, f64::from(i32::MAX)) as i32
    } else {
        value
    }
}
