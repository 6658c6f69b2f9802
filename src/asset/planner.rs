//! # Optimization Planner
//!
//! Logica pura che traduce le proprietà misurate di un'immagine e i limiti
//! configurati in un comando per l'optimizer esterno.
//!
//! ## Regole per formato:
//! - **JPEG**: qualità sempre vincolata; max-width solo se la larghezza eccede,
//!   max-height solo se l'altezza eccede
//! - **PNG**: riduzione colori solo se l'immagine non usa trasparenza;
//!   conversione aggressiva (`-cb -fd`) solo se eccedono entrambe le dimensioni
//! - **GIF** e altri formati: nessun comando

use crate::args;
use crate::asset::assessment::ImageAssessment;
use crate::config::Limits;
use crate::media_type::ImageKind;
use std::fmt;
use std::path::Path;

/// User-supplied optimization settings, with 0 already replaced by the defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeOptions {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub max_colors: u16,
}

impl OptimizeOptions {
    /// Builds options where any 0 falls back to the configured default
    pub fn resolve(width: u32, height: u32, quality: u8, max_colors: u16, limits: &Limits) -> Self {
        Self {
            width: if width > 0 { width } else { limits.width },
            height: if height > 0 { height } else { limits.height },
            quality: if quality > 0 { quality.min(100) } else { limits.quality },
            max_colors: if max_colors > 0 { max_colors } else { limits.colors },
        }
    }

    pub fn from_limits(limits: &Limits) -> Self {
        Self::resolve(0, 0, 0, 0, limits)
    }
}

/// A single flag group passed to the optimizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Quality(u8),
    MaxWidth(u32),
    MaxHeight(u32),
    ReduceColors(u16),
    /// Convert big PNGs to JPEG and delete the source
    ConvertBig,
}

impl Constraint {
    fn args(&self) -> Vec<String> {
        match *self {
            Constraint::Quality(q) => args!["-q", q],
            Constraint::MaxWidth(w) => args!["-mw", w],
            Constraint::MaxHeight(h) => args!["-mh", h],
            Constraint::ReduceColors(n) => args!["-rc", "-mc", n],
            Constraint::ConvertBig => args!["-cb", "-fd"],
        }
    }
}

/// Ordered set of constraints for one optimizer invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptimizeCommand {
    pub constraints: Vec<Constraint>,
}

impl OptimizeCommand {
    /// Derives the command for an image, or `None` when the format is left untouched
    pub fn derive(kind: ImageKind, assessment: &ImageAssessment, options: &OptimizeOptions) -> Option<Self> {
        let mut constraints = Vec::new();

        match kind {
            ImageKind::Jpeg => {
                constraints.push(Constraint::Quality(options.quality));
                if assessment.oversize_width {
                    constraints.push(Constraint::MaxWidth(options.width));
                }
                if assessment.oversize_height {
                    constraints.push(Constraint::MaxHeight(options.height));
                }
            }
            ImageKind::Png => {
                if !assessment.has_transparency {
                    constraints.push(Constraint::ReduceColors(options.max_colors));
                }
                if assessment.oversize_both {
                    constraints.push(Constraint::ConvertBig);
                }
            }
            ImageKind::Gif | ImageKind::Other => return None,
        }

        Some(Self { constraints })
    }

    pub fn contains(&self, constraint: Constraint) -> bool {
        self.constraints.contains(&constraint)
    }

    pub fn converts_format(&self) -> bool {
        self.contains(Constraint::ConvertBig)
    }

    /// Full argument list, target path last
    pub fn to_args(&self, target: &Path) -> Vec<String> {
        let mut args: Vec<String> = self.constraints.iter().flat_map(Constraint::args).collect();
        args.push(target.to_string_lossy().into_owned());
        args
    }
}

impl fmt::Display for OptimizeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags: Vec<String> = self.constraints.iter().flat_map(Constraint::args).collect();
        f.write_str(&flags.join(" "))
    }
}
