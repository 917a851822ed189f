//! Console control events and console attachment.
//!
//! Handlers are kept in a process-wide registry and consulted newest-first;
//! the first handler that returns `true` consumes the event, the same way the
//! OS walks its own handler chain. The OS-level routine that feeds the
//! registry is installed on first use by [`CtrlHandlerGuard::new`] or
//! [`ctrl_channel`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

/// A console control event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CtrlEvent {
    /// Ctrl+C.
    CtrlC = 0,
    /// Ctrl+Break.
    Break = 1,
    /// The console window is closing.
    Close = 2,
    /// The user is logging off. Services only.
    Logoff = 5,
    /// The system is shutting down. Services only.
    Shutdown = 6,
}

impl CtrlEvent {
    /// Maps an OS event code, `None` for codes this crate does not know.
    pub fn from_raw(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::CtrlC),
            1 => Some(Self::Break),
            2 => Some(Self::Close),
            5 => Some(Self::Logoff),
            6 => Some(Self::Shutdown),
            _ => None,
        }
    }

    /// The OS event code.
    pub fn raw(self) -> u32 {
        self as u32
    }

    /// True for events `GenerateConsoleCtrlEvent` can send.
    pub fn can_generate(self) -> bool {
        matches!(self, Self::CtrlC | Self::Break)
    }
}

impl fmt::Display for CtrlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CtrlC => "ctrl-c",
            Self::Break => "ctrl-break",
            Self::Close => "close",
            Self::Logoff => "logoff",
            Self::Shutdown => "shutdown",
        })
    }
}

/// Identifies a registered handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Arc<dyn Fn(CtrlEvent) -> bool + Send + Sync>;

/// An ordered set of control-event handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    next_id: u64,
    handlers: Vec<(HandlerId, Handler)>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub const fn new() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
        }
    }

    /// Adds a handler; it runs before every handler added earlier.
    pub fn add<F>(&mut self, handler: F) -> HandlerId
    where
        F: Fn(CtrlEvent) -> bool + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler, returning false if it was not registered.
    pub fn remove(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(h, _)| *h != id);
        self.handlers.len() != before
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn snapshot(&self) -> Vec<Handler> {
        self.handlers.iter().rev().map(|(_, h)| Arc::clone(h)).collect()
    }

    /// Runs handlers newest-first until one returns `true`.
    pub fn dispatch(&self, event: CtrlEvent) -> bool {
        run_handlers(&self.snapshot(), event)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

fn run_handlers(handlers: &[Handler], event: CtrlEvent) -> bool {
    for (i, handler) in handlers.iter().enumerate() {
        if handler(event) {
            trace!(%event, position = i, "control event handled");
            return true;
        }
    }
    false
}

static REGISTRY: Mutex<HandlerRegistry> = Mutex::new(HandlerRegistry::new());

fn registry() -> MutexGuard<'static, HandlerRegistry> {
    // Handlers run outside the lock, so a poisoned registry is still consistent.
    REGISTRY.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Adds a handler to the process-wide registry.
///
/// This does not install the OS routine; use [`CtrlHandlerGuard`] for that.
pub fn add_handler<F>(handler: F) -> HandlerId
where
    F: Fn(CtrlEvent) -> bool + Send + Sync + 'static,
{
    registry().add(handler)
}

/// Removes a handler from the process-wide registry.
pub fn remove_handler(id: HandlerId) -> bool {
    registry().remove(id)
}

/// Delivers an event to the process-wide registry.
///
/// Returns `true` if a handler consumed it. Handlers run without the registry
/// lock held and may add or remove handlers.
pub fn dispatch(event: CtrlEvent) -> bool {
    let handlers = registry().snapshot();
    run_handlers(&handlers, event)
}

#[cfg(windows)]
pub use native::{
    console_window, ctrl_channel, generate_ctrl_event, ignore_ctrl_c, AttachTarget, Console,
    CtrlHandlerGuard,
};

#[cfg(windows)]
mod native {
    use super::*;
    use crate::error::{Error, Result};
    use crate::window::WindowHandle;
    use std::sync::mpsc::{self, Receiver};
    use tracing::{debug, warn};
    use windows::Win32::Foundation::{BOOL, FALSE, TRUE};
    use windows::Win32::System::Console::{
        AllocConsole, AttachConsole, FreeConsole, GenerateConsoleCtrlEvent, GetConsoleWindow,
        SetConsoleCtrlHandler, ATTACH_PARENT_PROCESS,
    };

    static INSTALLED: Mutex<bool> = Mutex::new(false);

    unsafe extern "system" fn ctrl_routine(ctrl_type: u32) -> BOOL {
        match CtrlEvent::from_raw(ctrl_type) {
            Some(event) => BOOL::from(dispatch(event)),
            None => {
                debug!(ctrl_type, "unknown console control event");
                FALSE
            }
        }
    }

    fn install_routine() -> Result<()> {
        let mut installed = INSTALLED.lock().unwrap_or_else(|p| p.into_inner());
        if *installed {
            return Ok(());
        }
        // SAFETY: ctrl_routine is a plain function that lives for the whole process.
        if let Err(e) = unsafe { SetConsoleCtrlHandler(Some(ctrl_routine), TRUE) } {
            warn!("failed to install console control handler: {e}");
            return Err(e.into());
        }
        debug!("console control handler installed");
        *installed = true;
        Ok(())
    }

    /// A registered handler, removed on drop.
    #[derive(Debug)]
    pub struct CtrlHandlerGuard {
        id: HandlerId,
    }

    impl CtrlHandlerGuard {
        /// Registers `handler`, installing the OS routine if needed.
        pub fn new<F>(handler: F) -> Result<Self>
        where
            F: Fn(CtrlEvent) -> bool + Send + Sync + 'static,
        {
            install_routine()?;
            Ok(Self {
                id: add_handler(handler),
            })
        }

        /// The registry id of this handler.
        pub fn id(&self) -> HandlerId {
            self.id
        }
    }

    impl Drop for CtrlHandlerGuard {
        fn drop(&mut self) {
            remove_handler(self.id);
        }
    }

    /// Forwards every control event to a channel.
    ///
    /// Events are consumed while the receiver is alive. Once it is dropped the
    /// handler passes events on, and it is unregistered at the next event.
    pub fn ctrl_channel() -> Result<Receiver<CtrlEvent>> {
        install_routine()?;
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let id = Arc::new(Mutex::new(None::<HandlerId>));
        let own_id = Arc::clone(&id);

        let handler_id = add_handler(move |event| {
            let sent = tx
                .lock()
                .map(|tx| tx.send(event).is_ok())
                .unwrap_or(false);
            if !sent {
                if let Some(id) = own_id.lock().ok().and_then(|mut id| id.take()) {
                    remove_handler(id);
                }
            }
            sent
        });
        if let Ok(mut slot) = id.lock() {
            *slot = Some(handler_id);
        }
        Ok(rx)
    }

    /// Makes the process ignore (`true`) or honor (`false`) Ctrl+C.
    ///
    /// The setting is inherited by child processes.
    pub fn ignore_ctrl_c(ignore: bool) -> Result<()> {
        // SAFETY: a null routine toggles the process's Ctrl+C attribute.
        unsafe { SetConsoleCtrlHandler(None, BOOL::from(ignore))? };
        Ok(())
    }

    /// Sends Ctrl+C or Ctrl+Break to a process group sharing this console.
    ///
    /// Group 0 targets every process attached to the console.
    pub fn generate_ctrl_event(event: CtrlEvent, process_group: u32) -> Result<()> {
        if !event.can_generate() {
            return Err(Error::unsupported(format!("cannot generate a {event} event")));
        }
        // SAFETY: plain values.
        unsafe { GenerateConsoleCtrlEvent(event.raw(), process_group)? };
        Ok(())
    }

    /// Which console to attach to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum AttachTarget {
        /// The parent process's console.
        Parent,
        /// The console of a specific process.
        Process(u32),
    }

    impl AttachTarget {
        fn to_native(self) -> u32 {
            match self {
                AttachTarget::Parent => ATTACH_PARENT_PROCESS,
                AttachTarget::Process(pid) => pid,
            }
        }
    }

    /// The process's attachment to a console, detached on drop.
    #[derive(Debug)]
    pub struct Console {
        attached: bool,
    }

    impl Console {
        /// Creates a new console for this process.
        pub fn alloc() -> Result<Self> {
            // SAFETY: no preconditions; fails if a console is already attached.
            unsafe { AllocConsole()? };
            Ok(Self { attached: true })
        }

        /// Attaches to another process's console.
        pub fn attach(target: AttachTarget) -> Result<Self> {
            // SAFETY: plain value.
            unsafe { AttachConsole(target.to_native())? };
            Ok(Self { attached: true })
        }

        /// Detaches from the console, reporting failure.
        pub fn free(mut self) -> Result<()> {
            self.attached = false;
            // SAFETY: this value owns the attachment.
            unsafe { FreeConsole()? };
            Ok(())
        }
    }

    impl Drop for Console {
        fn drop(&mut self) {
            if self.attached {
                // SAFETY: this value owns the attachment.
                let _ = unsafe { FreeConsole() };
            }
        }
    }

    /// The window of the attached console, if any.
    pub fn console_window() -> Option<WindowHandle> {
        // SAFETY: no preconditions.
        let hwnd = unsafe { GetConsoleWindow() };
        (!hwnd.0.is_null()).then(|| WindowHandle::from_raw(hwnd))
    }

}
