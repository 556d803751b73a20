//! Plugin catalog served to paid accounts.

use crate::models::PluginEntry;

pub static PLUGIN_CATALOG: &[PluginEntry] = &[
    PluginEntry {
        id: "spotify-control",
        name: "Spotify Controller",
        version: "1.2.0",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/spotify-v1.2.0/spotify-control.zip",
        size: "2.1 MB",
        checksum: "sha256:abc123...",
    },
    PluginEntry {
        id: "email-assistant",
        name: "Email Assistant",
        version: "2.0.1",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/email-v2.0.1/email-assistant.zip",
        size: "3.4 MB",
        checksum: "sha256:def456...",
    },
    PluginEntry {
        id: "calendar-sync",
        name: "Calendar Integration",
        version: "1.5.0",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/calendar-v1.5.0/calendar-sync.zip",
        size: "1.8 MB",
        checksum: "sha256:ghi789...",
    },
    PluginEntry {
        id: "smart-home",
        name: "Smart Home Hub",
        version: "1.3.2",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/smarthome-v1.3.2/smart-home.zip",
        size: "4.2 MB",
        checksum: "sha256:jkl012...",
    },
    PluginEntry {
        id: "task-manager",
        name: "Task Manager Pro",
        version: "1.1.0",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/tasks-v1.1.0/task-manager.zip",
        size: "1.5 MB",
        checksum: "sha256:mno345...",
    },
    PluginEntry {
        id: "weather-advanced",
        name: "Advanced Weather",
        version: "1.0.5",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/weather-v1.0.5/weather-advanced.zip",
        size: "2.0 MB",
        checksum: "sha256:pqr678...",
    },
    PluginEntry {
        id: "code-assistant",
        name: "Code Assistant",
        version: "1.4.0",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/code-v1.4.0/code-assistant.zip",
        size: "5.3 MB",
        checksum: "sha256:stu901...",
    },
    PluginEntry {
        id: "translation",
        name: "Language Translator",
        version: "1.2.3",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/translate-v1.2.3/translation.zip",
        size: "3.1 MB",
        checksum: "sha256:vwx234...",
    },
    PluginEntry {
        id: "news-reader",
        name: "Smart News Reader",
        version: "1.0.8",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/news-v1.0.8/news-reader.zip",
        size: "1.9 MB",
        checksum: "sha256:yz0567...",
    },
    PluginEntry {
        id: "workout-coach",
        name: "Workout Coach",
        version: "1.1.2",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/workout-v1.1.2/workout-coach.zip",
        size: "2.7 MB",
        checksum: "sha256:abc890...",
    },
    PluginEntry {
        id: "recipe-finder",
        name: "Recipe Finder",
        version: "1.0.3",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/recipe-v1.0.3/recipe-finder.zip",
        size: "1.6 MB",
        checksum: "sha256:def123...",
    },
    PluginEntry {
        id: "github-integration",
        name: "GitHub Manager",
        version: "1.3.0",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/github-v1.3.0/github-integration.zip",
        size: "2.4 MB",
        checksum: "sha256:ghi456...",
    },
    PluginEntry {
        id: "pomodoro-timer",
        name: "Pomodoro Timer",
        version: "1.0.0",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/pomodoro-v1.0.0/pomodoro-timer.zip",
        size: "800 KB",
        checksum: "sha256:jkl789...",
    },
    PluginEntry {
        id: "crypto-tracker",
        name: "Crypto Price Tracker",
        version: "1.1.5",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/crypto-v1.1.5/crypto-tracker.zip",
        size: "1.3 MB",
        checksum: "sha256:mno012...",
    },
    PluginEntry {
        id: "meditation-guide",
        name: "Meditation Guide",
        version: "1.0.7",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/meditation-v1.0.7/meditation-guide.zip",
        size: "6.2 MB",
        checksum: "sha256:pqr345...",
    },
    PluginEntry {
        id: "window-manager",
        name: "Window Manager",
        version: "1.2.1",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/window-v1.2.1/window-manager.zip",
        size: "1.1 MB",
        checksum: "sha256:stu678...",
    },
    PluginEntry {
        id: "youtube-controller",
        name: "YouTube Voice Control",
        version: "1.4.2",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/youtube-v1.4.2/youtube-controller.zip",
        size: "2.8 MB",
        checksum: "sha256:vwx901...",
    },
    PluginEntry {
        id: "file-organizer",
        name: "Smart File Organizer",
        version: "2.1.0",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/files-v2.1.0/file-organizer.zip",
        size: "3.2 MB",
        checksum: "sha256:yz1234...",
    },
    PluginEntry {
        id: "browser-automation",
        name: "Browser Automation",
        version: "1.3.1",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/browser-v1.3.1/browser-automation.zip",
        size: "4.1 MB",
        checksum: "sha256:abc567...",
    },
    PluginEntry {
        id: "screenshot-tool",
        name: "Screenshot Master",
        version: "1.0.9",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/screenshot-v1.0.9/screenshot-tool.zip",
        size: "2.3 MB",
        checksum: "sha256:def890...",
    },
    PluginEntry {
        id: "notes-dictation",
        name: "Voice Notes Pro",
        version: "2.3.0",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/notes-v2.3.0/notes-dictation.zip",
        size: "3.7 MB",
        checksum: "sha256:ghi012...",
    },
    PluginEntry {
        id: "system-monitor",
        name: "System Monitor Pro",
        version: "1.5.3",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/monitor-v1.5.3/system-monitor.zip",
        size: "2.9 MB",
        checksum: "sha256:jkl345...",
    },
    PluginEntry {
        id: "meeting-assistant",
        name: "Meeting Assistant",
        version: "1.6.0",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/meeting-v1.6.0/meeting-assistant.zip",
        size: "4.5 MB",
        checksum: "sha256:mno678...",
    },
    PluginEntry {
        id: "password-manager",
        name: "Password Vault",
        version: "1.1.4",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/password-v1.1.4/password-manager.zip",
        size: "2.6 MB",
        checksum: "sha256:pqr901...",
    },
    PluginEntry {
        id: "clipboard-manager",
        name: "Clipboard History",
        version: "1.0.6",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/clipboard-v1.0.6/clipboard-manager.zip",
        size: "1.4 MB",
        checksum: "sha256:stu234...",
    },
    PluginEntry {
        id: "focus-mode",
        name: "Focus Mode",
        version: "1.2.2",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/focus-v1.2.2/focus-mode.zip",
        size: "1.7 MB",
        checksum: "sha256:vwx567...",
    },
    PluginEntry {
        id: "voice-commands-custom",
        name: "Custom Command Builder",
        version: "2.0.0",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/custom-v2.0.0/voice-commands-custom.zip",
        size: "3.9 MB",
        checksum: "sha256:yz8901...",
    },
    PluginEntry {
        id: "social-media-poster",
        name: "Social Media Manager",
        version: "1.3.5",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/social-v1.3.5/social-media-poster.zip",
        size: "2.5 MB",
        checksum: "sha256:abc234...",
    },
    PluginEntry {
        id: "expense-tracker",
        name: "Expense Tracker",
        version: "1.1.8",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/expense-v1.1.8/expense-tracker.zip",
        size: "1.9 MB",
        checksum: "sha256:def567...",
    },
    PluginEntry {
        id: "alarm-reminder",
        name: "Smart Alarms & Reminders",
        version: "1.4.3",
        file_url: "https://github.com/jarvis-omega/plugins/releases/download/alarm-v1.4.3/alarm-reminder.zip",
        size: "2.2 MB",
        checksum: "sha256:ghi890...",
    },
];

pub fn find_plugin(id: &str) -> Option<&'static PluginEntry> {
    PLUGIN_CATALOG.iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_are_unique() {
        let ids: HashSet<_> = PLUGIN_CATALOG.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), PLUGIN_CATALOG.len());
        assert_eq!(PLUGIN_CATALOG.len(), 30);
    }

    #[test]
    fn test_find_plugin() {
        assert_eq!(find_plugin("smart-home").map(|p| p.name), Some("Smart Home Hub"));
        assert!(find_plugin("does-not-exist").is_none());
    }
}
