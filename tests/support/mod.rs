//! Scripted HTTP endpoint for sequenced-response scenarios the mock server
//! cannot express (Nth request gets the Nth status).

// std
use std::{
	sync::{Arc, Mutex},
	time::Instant,
};
// crates.io
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::{TcpListener, TcpStream},
};

/// Handle to a scripted endpoint.
pub struct ScriptedEndpoint {
	/// Base URL (`http://127.0.0.1:<port>`).
	pub url: String,
	/// Arrival instants, one per accepted request.
	pub hits: Arc<Mutex<Vec<Instant>>>,
	/// Raw request text, one entry per accepted request.
	pub requests: Arc<Mutex<Vec<String>>>,
}
impl ScriptedEndpoint {
	/// Number of requests served so far.
	pub fn hit_count(&self) -> usize {
		self.hits.lock().expect("Hit log lock should not be poisoned.").len()
	}

	/// Gaps between consecutive request arrivals.
	pub fn gaps(&self) -> Vec<std::time::Duration> {
		let hits = self.hits.lock().expect("Hit log lock should not be poisoned.");

		hits.windows(2).map(|pair| pair[1].duration_since(pair[0])).collect()
	}

	/// Raw text of the `index`-th request.
	pub fn request(&self, index: usize) -> String {
		self.requests.lock().expect("Request log lock should not be poisoned.")[index].clone()
	}
}

/// Serves the scripted status codes one per request (empty bodies), then
/// `200` with `final_body` for every request after the script runs out.
pub async fn spawn_scripted_endpoint(
	statuses: Vec<u16>,
	final_body: String,
) -> ScriptedEndpoint {
	let listener =
		TcpListener::bind("127.0.0.1:0").await.expect("Scripted endpoint should bind.");
	let addr = listener.local_addr().expect("Scripted endpoint should expose its address.");
	let hits = Arc::new(Mutex::new(Vec::new()));
	let requests = Arc::new(Mutex::new(Vec::new()));
	let hit_log = hits.clone();
	let request_log = requests.clone();

	tokio::spawn(async move {
		let mut remaining = statuses.into_iter();

		loop {
			let Ok((mut stream, _)) = listener.accept().await else {
				break;
			};

			hit_log.lock().expect("Hit log lock should not be poisoned.").push(Instant::now());

			let request = read_request(&mut stream).await;

			request_log
				.lock()
				.expect("Request log lock should not be poisoned.")
				.push(request);

			let response = match remaining.next() {
				Some(status) => format!(
					"HTTP/1.1 {status} Scripted\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
				),
				None => format!(
					"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: \
					 {}\r\nconnection: close\r\n\r\n{final_body}",
					final_body.len(),
				),
			};
			let _ = stream.write_all(response.as_bytes()).await;
			let _ = stream.shutdown().await;
		}
	});

	ScriptedEndpoint { url: format!("http://{addr}"), hits, requests }
}

/// Reads one HTTP request (headers plus any `content-length` body) and
/// returns its text.
async fn read_request(stream: &mut TcpStream) -> String {
	let mut buf = Vec::new();
	let mut chunk = [0_u8; 1024];

	loop {
		let Ok(n) = stream.read(&mut chunk).await else {
			break;
		};

		if n == 0 {
			break;
		}

		buf.extend_from_slice(&chunk[..n]);

		if let Some(headers_end) = find_headers_end(&buf) {
			let content_length = parse_content_length(&buf[..headers_end]);

			if buf.len() - headers_end >= content_length {
				break;
			}
		}
	}

	String::from_utf8_lossy(&buf).into_owned()
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
	buf.windows(4).position(|window| window == b"\r\n\r\n").map(|pos| pos + 4)
}

fn parse_content_length(headers: &[u8]) -> usize {
	let text = String::from_utf8_lossy(headers);

	text.lines()
		.find_map(|line| {
			let (name, value) = line.split_once(':')?;

			if name.trim().eq_ignore_ascii_case("content-length") {
				value.trim().parse().ok()
			} else {
				None
			}
		})
		.unwrap_or(0)
}
