//! Minimal SNTP query (RFC 4330): one 48-byte UDP exchange, returning the
//! server's transmit time as Unix epoch seconds. The NTP protocol proper
//! (poll intervals, clock filtering) is out of scope — `ntpsign` only
//! needs an externally-attested instant.

use std::net::UdpSocket;
use std::time::Duration;

use serebo_core::SereboError;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

const NTP_PACKET_LEN: usize = 48;

/// Ask `server` (host:port, conventionally port 123) for its current time.
pub fn query(server: &str, timeout: Duration) -> Result<f64, SereboError> {
    let socket =
        UdpSocket::bind("0.0.0.0:0").map_err(|e| SereboError::remote(server, e))?;
    socket
        .set_read_timeout(Some(timeout))
        .map_err(|e| SereboError::remote(server, e))?;
    socket
        .connect(server)
        .map_err(|e| SereboError::remote(server, e))?;

    // LI = 0, version = 3, mode = 3 (client); everything else zero.
    let mut request = [0u8; NTP_PACKET_LEN];
    request[0] = 0b0001_1011;
    socket
        .send(&request)
        .map_err(|e| SereboError::remote(server, e))?;

    let mut response = [0u8; NTP_PACKET_LEN];
    let n = socket
        .recv(&mut response)
        .map_err(|e| SereboError::remote(server, e))?;
    if n < NTP_PACKET_LEN {
        return Err(SereboError::remote(
            server,
            format!("short NTP response: {n} bytes"),
        ));
    }

    // Transmit timestamp: seconds since 1900 at bytes 40..44, binary
    // fraction at 44..48.
    let secs = u32::from_be_bytes(response[40..44].try_into().unwrap()) as u64;
    let frac = u32::from_be_bytes(response[44..48].try_into().unwrap()) as f64 / (1u64 << 32) as f64;
    if secs < NTP_UNIX_OFFSET {
        return Err(SereboError::remote(server, "NTP timestamp predates Unix epoch"));
    }
    Ok((secs - NTP_UNIX_OFFSET) as f64 + frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A loopback "NTP server" that replies with a fixed transmit time.
    fn fake_server(transmit_unix_secs: u64) -> String {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();
        std::thread::spawn(move || {
            let mut buf = [0u8; NTP_PACKET_LEN];
            let (_, peer) = socket.recv_from(&mut buf).unwrap();
            let mut reply = [0u8; NTP_PACKET_LEN];
            reply[0] = 0b0001_1100; // LI=0, VN=3, mode=4 (server)
            let ntp_secs = (transmit_unix_secs + NTP_UNIX_OFFSET) as u32;
            reply[40..44].copy_from_slice(&ntp_secs.to_be_bytes());
            socket.send_to(&reply, peer).unwrap();
        });
        addr.to_string()
    }

    #[test]
    fn query_reads_the_transmit_timestamp() {
        // 2024-03-05 07:09:02 UTC
        let server = fake_server(1_709_622_542);
        let secs = query(&server, Duration::from_secs(2)).unwrap();
        assert_eq!(secs.trunc() as u64, 1_709_622_542);
    }

    #[test]
    fn silent_server_times_out_as_remote_unavailable() {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap().to_string();
        let err = query(&addr, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, SereboError::RemoteUnavailable { .. }));
    }
}
