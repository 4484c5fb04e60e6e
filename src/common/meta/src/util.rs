// Copyright 2023 Greptime Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Gets the end key of the prefix range `[key, end)` that covers every key
/// starting with `key`. Returns `[0]` if no such end exists.
pub fn get_prefix_end_key(key: &[u8]) -> Vec<u8> {
    for (i, v) in key.iter().enumerate().rev() {
        if *v < 0xFF {
            let mut end = Vec::from(&key[..=i]);
            end[i] = *v + 1;
            return end;
        }
    }

    // next prefix does not exist (e.g., 0xffff);
    vec![0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_prefix() {
        let key = b"__namespace/";
        assert_eq!(b"__namespace0".to_vec(), get_prefix_end_key(key));

        let key = vec![b'a', 0xFF];
        assert_eq!(vec![b'b'], get_prefix_end_key(&key));

        let key = vec![0xFF, 0xFF];
        assert_eq!(vec![0], get_prefix_end_key(&key));
    }
}
