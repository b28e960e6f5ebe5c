//! 列表形响应的统一解码
//!
//! 网关返回的列表可能是裸数组，也可能是分页对象（`results` / `data` / `items`），
//! 甚至是 `null`。这里一次性归一成 `Vec<T>`，上层永远不需要判断响应形状。

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use super::first_of;

#[derive(Deserialize)]
#[serde(untagged)]
enum ListShape<T> {
    Plain(Vec<T>),
    Paginated {
        results: Option<Vec<T>>,
        data: Option<Vec<T>>,
        items: Option<Vec<T>>,
    },
    Empty,
}

/// 把任意列表形状解码为有序的 `Vec<T>`
pub fn deserialize_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let shape = ListShape::<T>::deserialize(deserializer)?;
    Ok(match shape {
        ListShape::Plain(items) => items,
        ListShape::Paginated {
            results,
            data,
            items,
        } => first_of([results, data, items])
            .ok_or_else(|| D::Error::custom("分页对象中没有 results / data / items"))?,
        ListShape::Empty => Vec::new(),
    })
}

/// 顶层响应本身就是列表时使用
#[derive(Debug)]
pub struct NormalizedList<T>(pub Vec<T>);

impl<T> NormalizedList<T> {
    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
}

impl<'de, T> Deserialize<'de> for NormalizedList<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_list(deserializer).map(NormalizedList)
    }
}
