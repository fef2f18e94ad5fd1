use std::any::Any;

use thiserror::Error;

/// Recoverable failure raised while a hook is being created.
///
/// The State is left untouched when this is returned: the cursor does not
/// advance, so the caller may recover and keep rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("{hook} can't be used with virtual components")]
    VirtualHost { hook: &'static str },
}

/// A panic that escaped a microtask and reached the event loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("uncaught error: {message}")]
pub struct UncaughtError {
    pub message: String,
}

impl UncaughtError {
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_host_message_names_the_hook() {
        let err = HookError::VirtualHost {
            hook: "use_attribute",
        };
        let message = err.to_string();
        assert!(message.contains("use_attribute"));
        assert!(message.contains("virtual"));
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload = std::panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(UncaughtError::from_panic(payload.as_ref()).message, "boom 1");

        let payload = std::panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(UncaughtError::from_panic(payload.as_ref()).message, "static");
    }
}
