use std::fmt;
use std::ptr::NonNull;

use objc2_application_services::AXUIElement;
use objc2_core_foundation::{CFRetained, CFString, CFType};

type RawAXError = objc2_application_services::AXError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AXError {
    InvalidUIElement,
    Other(RawAXError),
}

impl From<RawAXError> for AXError {
    fn from(err: RawAXError) -> Self {
        if err == RawAXError::InvalidUIElement {
            AXError::InvalidUIElement
        } else {
            AXError::Other(err)
        }
    }
}

impl fmt::Display for AXError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AXError::InvalidUIElement => {
                write!(
                    f,
                    "The AXUIElementRef passed to the function is invalid (code: {})",
                    RawAXError::InvalidUIElement.0
                )
            }
            AXError::Other(err) => write!(f, "{}", decorate_raw_ax_error(*err)),
        }
    }
}

impl std::error::Error for AXError {}

pub(crate) fn get_attribute<T: objc2_core_foundation::Type>(
    element: &AXUIElement,
    attribute: &CFString,
) -> Result<CFRetained<T>, AXError> {
    let mut value: *const CFType = std::ptr::null();
    let value_ptr = NonNull::new(&mut value as *mut *const CFType).unwrap();

    let res = unsafe { element.copy_attribute_value(attribute, value_ptr) };
    if res != RawAXError::Success {
        return Err(res.into());
    }
    let value = unsafe { *value_ptr.as_ptr() as *mut T };
    // Safety: value shouldn't be null as copy attribute call success
    let value = NonNull::new(value).unwrap();
    let value = unsafe { CFRetained::from_raw(value) };
    Ok(value)
}

pub(crate) fn set_attribute_value(
    element: &AXUIElement,
    attribute: &CFString,
    value: &CFType,
) -> Result<(), AXError> {
    let res = unsafe { element.set_attribute_value(attribute, value) };
    if res != RawAXError::Success {
        return Err(res.into());
    }
    Ok(())
}

#[allow(non_snake_case)]
pub(crate) fn kAXPositionAttribute() -> CFRetained<CFString> {
    CFString::from_static_str("AXPosition")
}

#[allow(non_snake_case)]
pub(crate) fn kAXSizeAttribute() -> CFRetained<CFString> {
    CFString::from_static_str("AXSize")
}

#[allow(non_snake_case)]
pub(crate) fn kAXFrontmostAttribute() -> CFRetained<CFString> {
    CFString::from_static_str("AXFrontmost")
}

#[allow(non_snake_case)]
pub(crate) fn kAXMainAttribute() -> CFRetained<CFString> {
    CFString::from_static_str("AXMain")
}

#[allow(non_snake_case)]
pub(crate) fn kAXTitleAttribute() -> CFRetained<CFString> {
    CFString::from_static_str("AXTitle")
}

#[allow(non_snake_case)]
pub(crate) fn kAXWindowsAttribute() -> CFRetained<CFString> {
    CFString::from_static_str("AXWindows")
}

fn decorate_raw_ax_error(error: RawAXError) -> String {
    let description = match error {
        RawAXError::Success => "No error occurred",
        RawAXError::Failure => "A system error occurred, such as the failure to allocate an object",
        RawAXError::IllegalArgument => "An illegal argument was passed to the function",
        RawAXError::InvalidUIElement => "The AXUIElementRef passed to the function is invalid",
        RawAXError::InvalidUIElementObserver => {
            "The AXObserverRef passed to the function is not a valid observer"
        }
        RawAXError::CannotComplete => {
            "The function cannot complete because messaging failed or the application is busy/unresponsive"
        }
        RawAXError::AttributeUnsupported => "The attribute is not supported by the AXUIElementRef",
        RawAXError::ActionUnsupported => "The action is not supported by the AXUIElementRef",
        RawAXError::NotificationUnsupported => {
            "The notification is not supported by the AXUIElementRef"
        }
        RawAXError::NotImplemented => "The function or method is not implemented",
        RawAXError::NotificationAlreadyRegistered => {
            "This notification has already been registered for"
        }
        RawAXError::NotificationNotRegistered => "The notification is not registered yet",
        RawAXError::APIDisabled => "The accessibility API is disabled",
        RawAXError::NoValue => "The requested value or AXUIElementRef does not exist",
        RawAXError::ParameterizedAttributeUnsupported => {
            "The parameterized attribute is not supported by the AXUIElementRef"
        }
        RawAXError::NotEnoughPrecision => "Not enough precision",
        _ => "Unknown AXError",
    };
    format!("{} (code: {})", description, error.0)
}
