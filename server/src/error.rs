/// Reasons a create or join request is refused.
///
/// `Display` yields the message shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Sala no encontrada")]
    RoomNotFound,
    #[error("Ya hay un controlador conectado")]
    RoomFull,
    #[error("No hay salas disponibles")]
    CapacityExhausted,
    #[error("La conexión ya pertenece a una sala")]
    AlreadyBound,
}
