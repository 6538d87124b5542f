use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

macro_rules! string_enum {
    ($name:ident, $what:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = BridgeError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                match raw {
                    $($wire => Ok($name::$variant),)+
                    other => Err(BridgeError::param_invalid(format!(
                        concat!("unknown ", $what, " '{}'"),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(PopupButtonKind, "popup button type" {
    Default => "default",
    Ok => "ok",
    Close => "close",
    Cancel => "cancel",
    Destructive => "destructive",
});

impl PopupButtonKind {
    /// Only these kinds carry caller-supplied text; the host labels the rest.
    pub fn requires_text(self) -> bool {
        matches!(self, PopupButtonKind::Default | PopupButtonKind::Destructive)
    }
}

string_enum!(HapticImpactStyle, "haptic impact style" {
    Light => "light",
    Medium => "medium",
    Heavy => "heavy",
    Rigid => "rigid",
    Soft => "soft",
});

string_enum!(HapticNotificationType, "haptic notification type" {
    Error => "error",
    Success => "success",
    Warning => "warning",
});

string_enum!(InlineChatType, "inline chat type" {
    Users => "users",
    Bots => "bots",
    Groups => "groups",
    Channels => "channels",
});

string_enum!(HeaderColorKey, "header color key" {
    BgColor => "bg_color",
    SecondaryBgColor => "secondary_bg_color",
});

string_enum!(ColorScheme, "color scheme" {
    Light => "light",
    Dark => "dark",
});

impl Default for ColorScheme {
    fn default() -> Self {
        ColorScheme::Light
    }
}
