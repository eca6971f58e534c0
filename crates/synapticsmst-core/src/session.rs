//! Remote-control session guard
//!
//! Remote control must be enabled on a hub before its mailbox accepts EEPROM
//! or downstream commands, and it must be disabled again afterwards or the hub
//! stays in remote-control mode. [`RemoteControlSession`] enables it on every
//! hub from the Direct root down to the target device when opened, and
//! disables it in reverse order on [`close`](RemoteControlSession::close) or on
//! drop, whichever comes first.

use crate::aux::AuxChannel;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::protocol::regs::RC_ENABLE_MAGIC;
use crate::protocol::{Connection, RcCommand};
use crate::rad::{Rad, MAX_LAYERS};
use log::{debug, warn};

/// Scoped remote-control access to one device path on an open channel
///
/// The session holds the channel mutably, so two sessions can never be active
/// on the same channel at once.
pub struct RemoteControlSession<'c> {
    conn: Connection<'c>,
    /// Hubs `0..enabled` along the path currently have remote control on
    enabled: u8,
}

impl<'c> RemoteControlSession<'c> {
    /// Enable remote control on every hub down to `layer`/`rad`
    ///
    /// If enabling fails part way, the hubs already enabled are disabled again
    /// before the error is returned.
    pub fn open(channel: &'c mut dyn AuxChannel, layer: u8, rad: Rad) -> Result<Self> {
        if layer > MAX_LAYERS {
            return Err(Error::CascadeTooDeep { layer });
        }

        let mut session = Self {
            conn: Connection::new(channel, layer, rad),
            enabled: 0,
        };
        for level in 0..=layer {
            session
                .conn
                .rc_command_at(level, RcCommand::EnableRc, RC_ENABLE_MAGIC)?;
            session.enabled = level + 1;
        }

        debug!("Remote control enabled (layer {}, rad {})", layer, rad);
        Ok(session)
    }

    /// Open a session covering `device`
    pub fn for_device(channel: &'c mut dyn AuxChannel, device: &Device) -> Result<Self> {
        Self::open(channel, device.layer(), device.rad())
    }

    /// Whether register access to `device` is allowed through this session
    pub fn covers(&self, device: &Device) -> bool {
        self.conn.layer() == device.layer() && self.conn.rad() == device.rad()
    }

    /// Register access to the session's target device
    pub fn connection(&mut self) -> &mut Connection<'c> {
        &mut self.conn
    }

    /// Register access to a direct child of the target, behind `rad`
    ///
    /// The hubs above the child all have remote control enabled by this
    /// session, which is what relaying to the child requires.
    pub(crate) fn child_connection(&mut self, rad: Rad) -> Connection<'_> {
        self.conn.retarget(self.conn.layer() + 1, rad)
    }

    /// Disable remote control and end the session
    ///
    /// Every enabled hub gets exactly one disable, even if an earlier one
    /// fails; the first failure is returned.
    pub fn close(mut self) -> Result<()> {
        self.disable_all()
    }

    fn disable_all(&mut self) -> Result<()> {
        let mut first_err = None;
        while self.enabled > 0 {
            let level = self.enabled - 1;
            self.enabled = level;
            if let Err(e) = self.conn.rc_command_at(level, RcCommand::DisableRc, &[]) {
                warn!("Failed to disable remote control on layer {}: {}", level, e);
                first_err.get_or_insert(e);
            }
        }
        debug!("Remote control disabled (layer {})", self.conn.layer());
        first_err.map_or(Ok(()), Err)
    }
}

impl Drop for RemoteControlSession<'_> {
    fn drop(&mut self) {
        if self.enabled > 0 {
            // Errors were already logged; there is no caller left to report to
            let _ = self.disable_all();
        }
    }
}
