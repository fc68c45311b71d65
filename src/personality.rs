//! The five Big Five personality traits and a record holding one value per trait.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Probability a trait must strictly exceed to be reported as present.
pub const PRESENCE_THRESHOLD: f32 = 0.5;

/// Returns whether a predicted probability counts as the trait being present.
pub fn is_present(probability: f32) -> bool {
    probability > PRESENCE_THRESHOLD
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl Trait {
    /// All traits, in display and label order.
    pub const ALL: [Trait; 5] = [
        Trait::Openness,
        Trait::Conscientiousness,
        Trait::Extraversion,
        Trait::Agreeableness,
        Trait::Neuroticism,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::Openness => 0,
            Self::Conscientiousness => 1,
            Self::Extraversion => 2,
            Self::Agreeableness => 3,
            Self::Neuroticism => 4,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Openness => "o",
            Self::Conscientiousness => "c",
            Self::Extraversion => "e",
            Self::Agreeableness => "a",
            Self::Neuroticism => "n",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Openness => "Openness to Experience",
            Self::Conscientiousness => "Conscientiousness",
            Self::Extraversion => "Extraversion",
            Self::Agreeableness => "Agreeableness",
            Self::Neuroticism => "Neuroticism",
        }
    }

    /// Parses a model label or user input.
    ///
    /// Accepts the short code (`o`), the display name (`Openness to Experience`),
    /// the bare trait name (`openness`) and generic `LABEL_<i>` labels, which
    /// index into [`Trait::ALL`]. Matching ignores case and surrounding whitespace.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        if let Some(index) = label.strip_prefix("label_") {
            return index.parse::<usize>().ok().and_then(|i| Self::ALL.get(i).copied());
        }
        Self::ALL.into_iter().find(|t| {
            label == t.code()
                || label == t.name().to_lowercase()
                || label == format!("{:?}", t).to_lowercase()
        })
    }
}

impl Display for Trait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Trait {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown trait: {}", s))
    }
}

/// Exactly one value per trait. Serialized with the short trait codes as keys.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TraitMap<T> {
    pub o: T,
    pub c: T,
    pub e: T,
    pub a: T,
    pub n: T,
}

impl<T> TraitMap<T> {
    pub fn from_fn(mut f: impl FnMut(Trait) -> T) -> Self {
        Self {
            o: f(Trait::Openness),
            c: f(Trait::Conscientiousness),
            e: f(Trait::Extraversion),
            a: f(Trait::Agreeableness),
            n: f(Trait::Neuroticism),
        }
    }

    pub fn try_from_fn<E>(mut f: impl FnMut(Trait) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            o: f(Trait::Openness)?,
            c: f(Trait::Conscientiousness)?,
            e: f(Trait::Extraversion)?,
            a: f(Trait::Agreeableness)?,
            n: f(Trait::Neuroticism)?,
        })
    }

    pub fn get(&self, t: Trait) -> &T {
        match t {
            Trait::Openness => &self.o,
            Trait::Conscientiousness => &self.c,
            Trait::Extraversion => &self.e,
            Trait::Agreeableness => &self.a,
            Trait::Neuroticism => &self.n,
        }
    }

    pub fn get_mut(&mut self, t: Trait) -> &mut T {
        match t {
            Trait::Openness => &mut self.o,
            Trait::Conscientiousness => &mut self.c,
            Trait::Extraversion => &mut self.e,
            Trait::Agreeableness => &mut self.a,
            Trait::Neuroticism => &mut self.n,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Trait, &T)> {
        Trait::ALL.into_iter().map(move |t| (t, self.get(t)))
    }

    pub fn map<U>(&self, mut f: impl FnMut(Trait, &T) -> U) -> TraitMap<U> {
        TraitMap::from_fn(|t| f(t, self.get(t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_and_codes_are_fixed() {
        let codes: Vec<_> = Trait::ALL.iter().map(|t| t.code()).collect();
        assert_eq!(codes, ["o", "c", "e", "a", "n"]);
        for (i, t) in Trait::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }

    #[test]
    fn code_and_name_round_trip() {
        for t in Trait::ALL {
            assert_eq!(Trait::parse(t.code()), Some(t));
            assert_eq!(Trait::parse(t.name()), Some(t));
        }
        assert_eq!(Trait::parse(" OPENNESS "), Some(Trait::Openness));
        assert_eq!(Trait::parse("LABEL_4"), Some(Trait::Neuroticism));
        assert_eq!(Trait::parse("LABEL_5"), None);
        assert_eq!(Trait::parse("x"), None);
        assert!("honesty".parse::<Trait>().is_err());
    }

    #[test]
    fn threshold_is_strict() {
        assert!(!is_present(0.5));
        assert!(is_present(0.500_01));
        assert!(!is_present(0.0));
    }

    #[test]
    fn trait_map_iterates_in_order() {
        let mut map = TraitMap::from_fn(|t| t.index());
        *map.get_mut(Trait::Agreeableness) = 10;
        let values: Vec<_> = map.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, [0, 1, 2, 10, 4]);

        let json = serde_json::to_string(&map.map(|t, _| t.code())).unwrap();
        assert_eq!(json, r#"{"o":"o","c":"c","e":"e","a":"a","n":"n"}"#);
    }

    #[test]
    fn try_from_fn_stops_at_first_error() {
        let result: Result<TraitMap<u8>, Trait> =
            TraitMap::try_from_fn(|t| if t == Trait::Extraversion { Err(t) } else { Ok(1) });
        assert_eq!(result, Err(Trait::Extraversion));
    }
}
