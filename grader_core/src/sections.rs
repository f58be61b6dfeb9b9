//! # Control Sections
//!
//! The girder is checked at three control sections, each with two faces:
//!
//! ```text
//!   left support        mid-span        right support
//!   ──────┬──────────────────┬──────────────────┬──────
//!         2                  1                  3
//! ```
//!
//! Per-face data is held in [`SectionFaces<T>`], indexed by a
//! `(Section, Surface)` pair.

use serde::{Deserialize, Serialize};

/// Control cross-section of the girder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    /// Section 1 - mid-span
    Middle,
    /// Section 2 - left support
    Left,
    /// Section 3 - right support
    Right,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Middle, Section::Left, Section::Right];

    /// Section number used on the assignment sheets (1, 2, 3)
    pub fn number(&self) -> u8 {
        match self {
            Section::Middle => 1,
            Section::Left => 2,
            Section::Right => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Section::Middle),
            2 => Some(Section::Left),
            3 => Some(Section::Right),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Section::Middle => "middle",
            Section::Left => "left",
            Section::Right => "right",
        }
    }

    /// Supports are designed as T-sections, mid-span as a rectangle.
    pub fn is_support(&self) -> bool {
        !matches!(self, Section::Middle)
    }

    /// Face in tension under the design moment of this section
    pub fn design_tension_face(&self) -> Surface {
        match self {
            Section::Middle => Surface::Bot,
            Section::Left | Section::Right => Surface::Top,
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Face of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Top,
    Bot,
}

impl Surface {
    pub const ALL: [Surface; 2] = [Surface::Bot, Surface::Top];

    pub fn opposite(&self) -> Surface {
        match self {
            Surface::Top => Surface::Bot,
            Surface::Bot => Surface::Top,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Surface::Top => "top",
            Surface::Bot => "bot",
        }
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A value per face of one section.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Faces<T> {
    pub top: T,
    pub bot: T,
}

impl<T> Faces<T> {
    pub fn get(&self, surface: Surface) -> &T {
        match surface {
            Surface::Top => &self.top,
            Surface::Bot => &self.bot,
        }
    }

    pub fn get_mut(&mut self, surface: Surface) -> &mut T {
        match surface {
            Surface::Top => &mut self.top,
            Surface::Bot => &mut self.bot,
        }
    }
}

/// A value per `(Section, Surface)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SectionFaces<T> {
    pub middle: Faces<T>,
    pub left: Faces<T>,
    pub right: Faces<T>,
}

impl<T> SectionFaces<T> {
    pub fn section(&self, section: Section) -> &Faces<T> {
        match section {
            Section::Middle => &self.middle,
            Section::Left => &self.left,
            Section::Right => &self.right,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut Faces<T> {
        match section {
            Section::Middle => &mut self.middle,
            Section::Left => &mut self.left,
            Section::Right => &mut self.right,
        }
    }

    pub fn get(&self, section: Section, surface: Surface) -> &T {
        self.section(section).get(surface)
    }

    pub fn get_mut(&mut self, section: Section, surface: Surface) -> &mut T {
        self.section_mut(section).get_mut(surface)
    }

    /// Visit every `(section, surface)` pair in sheet order.
    pub fn iter(&self) -> impl Iterator<Item = (Section, Surface, &T)> {
        Section::ALL
            .into_iter()
            .flat_map(|s| Surface::ALL.into_iter().map(move |f| (s, f)))
            .map(move |(s, f)| (s, f, self.get(s, f)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_numbers_roundtrip() {
        for section in Section::ALL {
            assert_eq!(Section::from_number(section.number()), Some(section));
        }
        assert_eq!(Section::from_number(4), None);
    }

    #[test]
    fn test_design_tension_faces() {
        assert_eq!(Section::Middle.design_tension_face(), Surface::Bot);
        assert_eq!(Section::Left.design_tension_face(), Surface::Top);
        assert_eq!(Surface::Top.opposite(), Surface::Bot);
    }

    #[test]
    fn test_section_faces_indexing() {
        let mut faces: SectionFaces<f64> = SectionFaces::default();
        *faces.get_mut(Section::Left, Surface::Top) = 4.5;
        assert_eq!(*faces.get(Section::Left, Surface::Top), 4.5);
        assert_eq!(faces.left.top, 4.5);
        assert_eq!(faces.iter().count(), 6);
        assert_eq!(faces.iter().filter(|(_, _, v)| **v > 0.0).count(), 1);
    }

    #[test]
    fn test_surface_serialization() {
        assert_eq!(serde_json::to_string(&Surface::Bot).unwrap(), "\"bot\"");
    }
}
