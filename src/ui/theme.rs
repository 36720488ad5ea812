use crate::access::LocationAccessType;
use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    /// Indexed by [`LocationAccessType::code`]
    pub access: [Style; 4],
}

impl Theme {
    pub fn detect() -> Self {
        if !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            warn: Style::new().yellow().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
            access: [
                Style::new().bright_black(),
                Style::new().blue(),
                Style::new().yellow(),
                Style::new().red().bold(),
            ],
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            warn: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            access: [Style::new(); 4],
        }
    }

    pub fn access_style(&self, access_type: LocationAccessType) -> Style {
        self.access[access_type.code() as usize]
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
