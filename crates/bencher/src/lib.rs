//! Shared fixtures for the exchange benchmarks.

use std::net::SocketAddr;

use micro_exchange::connection::{Connection, PendingWrite};

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    input: TestInput,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, input: TestInput) -> Self {
        Self { name, group, input }
    }

    pub fn small(name: &'static str, input: TestInput) -> Self {
        Self::new(name, TestGroup::Small, input)
    }

    pub fn large(name: &'static str, input: TestInput) -> Self {
        Self::new(name, TestGroup::Large, input)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn input(&self) -> &TestInput {
        &self.input
    }
}

/// A named benchmark input. Line breaks in `content` are written as `\n`
/// and turned into CRLF by [`wire`](Self::wire).
#[derive(Debug, Copy, Clone)]
pub struct TestInput {
    label: &'static str,
    content: &'static str,
}

impl TestInput {
    pub const fn new(label: &'static str, content: &'static str) -> Self {
        Self { label, content }
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn wire(&self) -> String {
        self.content.replace('\n', "\r\n")
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Large,
}

pub static SMALL_HEAD: TestInput = TestInput::new(
    "get_small",
    "GET /index.html HTTP/1.1\nHost: 127.0.0.1:8080\nUser-Agent: curl/7.79.1\nAccept: */*\n\n",
);

pub static LARGE_HEAD: TestInput = TestInput::new(
    "get_large",
    "GET /api/v1/items?limit=50&offset=100&sort=name HTTP/1.1\n\
Host: api.example.com\n\
User-Agent: Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36\n\
Accept: application/json, text/plain, */*\n\
Accept-Language: en-US,en;q=0.9,de;q=0.8\n\
Accept-Encoding: gzip, deflate, br\n\
Referer: https://www.example.com/dashboard/items\n\
Cookie: sid=4f1c2a9b8e7d6c5b4a39281706f5e4d3; theme=dark; lang=en; tracking=off\n\
X-Requested-With: XMLHttpRequest\n\
X-Session-ID: 4f1c2a9b8e7d6c5b4a39281706f5e4d3\n\
Cache-Control: no-cache\n\
Pragma: no-cache\n\
Connection: keep-alive\n\n",
);

pub static SIMPLE_ENCODING: TestInput = TestInput::new("gzip_only", "gzip");

pub static WEIGHTED_ENCODING: TestInput =
    TestInput::new("weighted", "identity;q=0.1, br;q=0.9, bzip2;q=0.4, zlib;q=0.8, gzip;q=0.8, lz4;q=0.2, *;q=0.05");

/// A connection that accepts and completes every write without doing I/O.
#[derive(Debug, Default)]
pub struct NullConnection;

impl Connection for NullConnection {
    fn id(&self) -> u64 {
        0
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn is_incoming(&self) -> bool {
        true
    }

    fn write_request(&self, write: PendingWrite) {
        write.complete(true);
    }
}
