use std::net::SocketAddr;

use tracing::debug;

use crate::domain::{
    registry, CloseMode, ConnectionId, EventKind, GroupId, Mode, ReleaseCheck, RemoteEndpoint,
    SocketAdaptorError, SocketAdaptorResult, TransportKind,
};
use crate::ports::{SocketAdaptorApi, TransportApi};
use crate::service::core::{AdaptorState, SocketAdaptorService};
use crate::service::lifecycle::Lifecycle;

fn check_connection(state: &AdaptorState, id: ConnectionId) -> SocketAdaptorResult<()> {
    if !state.initialized {
        return Err(SocketAdaptorError::NotInitialized);
    }
    if id.index() >= state.connections.len() {
        return Err(SocketAdaptorError::UnknownConnection(id));
    }
    Ok(())
}

fn check_group(state: &AdaptorState, id: GroupId) -> SocketAdaptorResult<()> {
    if !state.initialized {
        return Err(SocketAdaptorError::NotInitialized);
    }
    if id.index() >= state.groups.len() {
        return Err(SocketAdaptorError::UnknownGroup(id));
    }
    Ok(())
}

impl<'a, T: TransportApi> Lifecycle<'a, T> {
    fn request_open(&mut self, id: ConnectionId) -> SocketAdaptorResult<()> {
        check_connection(&*self.state, id)?;
        let (_, group_cfg) = self.group_of(id);
        if group_cfg.auto_setup {
            return Err(SocketAdaptorError::AutoSetupManaged(id));
        }
        let conn = self.state.conn_mut(id);
        conn.request_open();
        debug!(connection = %id, demand = conn.open_demand(), "[sa-01] open requested");
        self.state.events.add(EventKind::StateMachine, id);
        Ok(())
    }

    fn request_close_api(&mut self, id: ConnectionId, abort: bool) -> SocketAdaptorResult<()> {
        check_connection(&*self.state, id)?;
        let (_, group_cfg) = self.group_of(id);
        if group_cfg.auto_setup && !abort {
            return Err(SocketAdaptorError::AutoSetupManaged(id));
        }

        let conn = self.state.conn_mut(id);
        if abort {
            conn.request_abort();
            conn.reset_open_demand();
            self.request_close(id, CloseMode::OfflineReset);
            self.process_state_machine(id);
        } else if conn.withdraw_open() == 0 {
            self.request_close(id, CloseMode::Offline);
            self.state.events.add(EventKind::StateMachine, id);
        }
        Ok(())
    }

    fn set_remote_address(&mut self, id: ConnectionId, addr: SocketAddr) -> SocketAdaptorResult<()> {
        check_connection(&*self.state, id)?;
        let (_, group_cfg) = self.group_of(id);
        registry::check_domain(group_cfg.domain(), &addr)?;
        if group_cfg.transport == TransportKind::Tcp && self.state.conn(id).mode() != Mode::Offline {
            return Err(SocketAdaptorError::RemoteAddressLocked(id));
        }

        let conn = self.state.conn_mut(id);
        registry::overwrite(conn, group_cfg.domain(), addr)?;
        conn.clear_release();
        debug!(connection = %id, remote = %addr, "[sa-01] remote address set");
        self.on_remote_changed(id);
        Ok(())
    }

    fn set_unique_remote_address(
        &mut self,
        group: GroupId,
        addr: SocketAddr,
    ) -> SocketAdaptorResult<Option<ConnectionId>> {
        check_group(&*self.state, group)?;
        registry::check_domain(self.group_config(group).domain(), &addr)?;
        Ok(self.assign_unique(group, addr))
    }

    fn release_remote_address(&mut self, id: ConnectionId, force: bool) -> SocketAdaptorResult<()> {
        check_connection(&*self.state, id)?;
        let check = self.state.conn_mut(id).check_release(force);
        match check {
            ReleaseCheck::NoOp => {}
            ReleaseCheck::Pending(_) => self.handle_release(id),
        }
        Ok(())
    }
}

impl<T: TransportApi> SocketAdaptorApi for SocketAdaptorService<T> {
    fn request_open(&self, connection: ConnectionId) -> SocketAdaptorResult<()> {
        self.with_lifecycle(|lifecycle| lifecycle.request_open(connection))
            .or_else(|error| self.reject("request_open", error))
    }

    fn request_close(&self, connection: ConnectionId, abort: bool) -> SocketAdaptorResult<()> {
        self.with_lifecycle(|lifecycle| lifecycle.request_close_api(connection, abort))
            .or_else(|error| self.reject("request_close", error))
    }

    fn set_remote_address(
        &self,
        connection: ConnectionId,
        addr: SocketAddr,
    ) -> SocketAdaptorResult<()> {
        self.with_lifecycle(|lifecycle| lifecycle.set_remote_address(connection, addr))
            .or_else(|error| self.reject("set_remote_address", error))
    }

    fn set_unique_remote_address(
        &self,
        group: GroupId,
        addr: SocketAddr,
    ) -> SocketAdaptorResult<Option<ConnectionId>> {
        self.with_lifecycle(|lifecycle| lifecycle.set_unique_remote_address(group, addr))
            .or_else(|error| self.reject("set_unique_remote_address", error))
    }

    fn release_remote_address(
        &self,
        connection: ConnectionId,
        force: bool,
    ) -> SocketAdaptorResult<()> {
        self.with_lifecycle(|lifecycle| lifecycle.release_remote_address(connection, force))
            .or_else(|error| self.reject("release_remote_address", error))
    }

    fn get_mode(&self, connection: ConnectionId) -> SocketAdaptorResult<Mode> {
        let result = {
            let state = self.state.lock();
            check_connection(&state, connection).map(|()| state.conn(connection).mode())
        };
        result.or_else(|error| self.reject("get_mode", error))
    }

    fn get_remote_address(&self, connection: ConnectionId) -> SocketAdaptorResult<RemoteEndpoint> {
        let result = {
            let state = self.state.lock();
            check_connection(&state, connection).map(|()| *state.conn(connection).remote())
        };
        result.or_else(|error| self.reject("get_remote_address", error))
    }
}
