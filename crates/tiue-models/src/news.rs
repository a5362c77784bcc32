//! News enums

text_enum! {
    /// News category
    NewsCategory ("news category") {
        Announcement => "announcement",
        Academic => "academic",
        Sports => "sports",
        Culture => "culture",
        Other => "other",
    }
}

impl Default for NewsCategory {
    fn default() -> Self {
        NewsCategory::Announcement
    }
}

text_enum! {
    /// Icon shown next to a news card in the mobile app
    NewsIcon ("news icon") {
        Megaphone => "megaphone-outline",
        School => "school-outline",
        Trophy => "trophy-outline",
        People => "people-outline",
        Calendar => "calendar-outline",
    }
}

impl Default for NewsIcon {
    fn default() -> Self {
        NewsIcon::Megaphone
    }
}
